use crate::error::Result;
use crate::toast::{ToastKind, ToastSink};
use handlebars::Handlebars;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::cmp::Ordering;
use std::str::FromStr;

const COURSE_TEMPLATE: &str = "course_grid";

/// A course card of the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub title: String,
    pub instructor: String,
    /// Enrolled learners
    pub learners: u32,
    pub is_new: bool,
    /// Average rating out of 5
    pub rating: f64,
    /// Current price in whole dollars
    pub price: u32,
}

impl Course {
    fn new(title: &str, instructor: &str, learners: u32, is_new: bool, rating: f64, price: u32) -> Self {
        Self {
            title: title.to_string(),
            instructor: instructor.to_string(),
            learners,
            is_new,
            rating,
            price,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    Popular,
    Newest,
    Rating,
    PriceLow,
    PriceHigh,
}

impl SortOrder {
    fn compare(&self, a: &Course, b: &Course) -> Ordering {
        match self {
            SortOrder::Popular => b.learners.cmp(&a.learners),
            SortOrder::Newest => b.is_new.cmp(&a.is_new),
            SortOrder::Rating => b.rating.total_cmp(&a.rating),
            SortOrder::PriceLow => a.price.cmp(&b.price),
            SortOrder::PriceHigh => b.price.cmp(&a.price),
        }
    }
}

impl FromStr for SortOrder {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "popular" => Ok(SortOrder::Popular),
            "newest" => Ok(SortOrder::Newest),
            "rating" => Ok(SortOrder::Rating),
            "price-low" => Ok(SortOrder::PriceLow),
            "price-high" => Ok(SortOrder::PriceHigh),
            _ => Err(()),
        }
    }
}

/// Sort courses in place
///
/// Ties keep their current relative order.
pub fn sort_courses(courses: &mut [Course], order: SortOrder) {
    courses.sort_by(|a, b| order.compare(a, b));
}

/// The course grid of the catalog page
pub struct Catalog {
    courses: Vec<Course>,
    templates: Handlebars<'static>,
}

impl Catalog {
    pub fn new(courses: Vec<Course>) -> Result<Self> {
        let mut templates = Handlebars::new();
        templates.register_template_string(
            COURSE_TEMPLATE,
            include_str!("./static/course_grid.hbs"),
        )?;
        Ok(Self { courses, templates })
    }

    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    /// Reorder the grid by a sort key from the browser
    ///
    /// Unknown keys leave the grid as it is and return `false`.
    pub fn sort_by_key(&mut self, key: &str) -> bool {
        match key.parse::<SortOrder>() {
            Ok(order) => {
                sort_courses(&mut self.courses, order);
                true
            }
            Err(()) => {
                log::debug!("ignoring unknown sort order '{}'", key);
                false
            }
        }
    }

    /// Confirm an add-to-cart click
    ///
    /// The cart itself is not modelled.
    pub fn add_to_cart(&self, title: &str, toasts: &dyn ToastSink) {
        toasts.push_toast(&format!("\"{}\" added to cart!", title), ToastKind::Success);
    }

    /// Confirm a "Load More Courses" click
    ///
    /// The demo catalog has no further pages; the grid stays as it is.
    pub fn load_more(&self, toasts: &dyn ToastSink) {
        toasts.push_toast("More courses loaded!", ToastKind::Success);
    }

    pub fn render(&self) -> Result<String> {
        let cards: Vec<_> = self
            .courses
            .iter()
            .map(|course| {
                json!({
                    "title": course.title,
                    "instructor": course.instructor,
                    "learners": format_learners(course.learners),
                    "is_new": course.is_new,
                    "rating": format!("{:.1}", course.rating),
                    "price": course.price,
                })
            })
            .collect();
        Ok(self
            .templates
            .render(COURSE_TEMPLATE, &json!({ "courses": cards }))?)
    }
}

/// Learner counts as shown on the cards, e.g. `12.5k`
fn format_learners(learners: u32) -> String {
    if learners >= 1000 {
        let thousands = learners as f64 / 1000.0;
        if learners % 1000 == 0 {
            format!("{}k", learners / 1000)
        } else {
            format!("{:.1}k", thousands)
        }
    } else {
        learners.to_string()
    }
}

/// Courses listed on the demo catalog, in page order
pub fn demo_courses() -> Vec<Course> {
    vec![
        Course::new("Beekeeping Fundamentals", "Sarah Mitchell", 12_500, false, 4.8, 49),
        Course::new("Advanced Hive Management Techniques", "Sarah Mitchell", 8_200, true, 4.9, 89),
        Course::new("Honey Harvesting and Processing", "David Chen", 15_300, false, 4.7, 59),
        Course::new("Queen Rearing Masterclass", "Maria Garcia", 4_100, true, 4.9, 129),
        Course::new("Bee Health and Disease Prevention", "James Okafor", 9_800, false, 4.6, 69),
        Course::new("Urban Beekeeping Essentials", "Lena Park", 3_600, true, 4.5, 39),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toast::tests::RecordingSink;

    fn titles(courses: &[Course]) -> Vec<&str> {
        courses.iter().map(|c| c.title.as_str()).collect()
    }

    #[test]
    fn test_sort_orders() {
        let mut courses = demo_courses();

        sort_courses(&mut courses, SortOrder::Popular);
        assert!(courses.windows(2).all(|w| w[0].learners >= w[1].learners));

        sort_courses(&mut courses, SortOrder::PriceLow);
        assert!(courses.windows(2).all(|w| w[0].price <= w[1].price));

        sort_courses(&mut courses, SortOrder::PriceHigh);
        assert!(courses.windows(2).all(|w| w[0].price >= w[1].price));

        sort_courses(&mut courses, SortOrder::Rating);
        assert!(courses.windows(2).all(|w| w[0].rating >= w[1].rating));
    }

    #[test]
    fn test_sorts_are_stable() {
        let mut courses = demo_courses();
        sort_courses(&mut courses, SortOrder::Newest);
        // New courses first, each group in page order
        assert_eq!(
            titles(&courses),
            vec![
                "Advanced Hive Management Techniques",
                "Queen Rearing Masterclass",
                "Urban Beekeeping Essentials",
                "Beekeeping Fundamentals",
                "Honey Harvesting and Processing",
                "Bee Health and Disease Prevention",
            ]
        );

        let mut courses = demo_courses();
        sort_courses(&mut courses, SortOrder::Rating);
        assert_eq!(
            &titles(&courses)[..2],
            &["Advanced Hive Management Techniques", "Queen Rearing Masterclass"]
        );
    }

    #[test]
    fn test_unknown_order_keeps_grid() {
        let mut catalog = Catalog::new(demo_courses()).unwrap();
        assert!(!catalog.sort_by_key("alphabetical"));
        assert_eq!(catalog.courses(), demo_courses().as_slice());
        assert!(catalog.sort_by_key("price-low"));
        assert_eq!(catalog.courses()[0].title, "Urban Beekeeping Essentials");
    }

    #[test]
    fn test_add_to_cart_toast() {
        let catalog = Catalog::new(demo_courses()).unwrap();
        let sink = RecordingSink::default();
        catalog.add_to_cart("Queen Rearing Masterclass", &sink);
        assert_eq!(
            sink.messages(),
            vec![(
                "\"Queen Rearing Masterclass\" added to cart!".to_string(),
                ToastKind::Success
            )]
        );
    }

    #[test]
    fn test_load_more_keeps_grid() {
        let catalog = Catalog::new(demo_courses()).unwrap();
        let sink = RecordingSink::default();
        catalog.load_more(&sink);
        assert_eq!(catalog.courses().len(), demo_courses().len());
        assert_eq!(
            sink.messages(),
            vec![("More courses loaded!".to_string(), ToastKind::Success)]
        );
    }

    #[test]
    fn test_render_in_grid_order() {
        let mut catalog = Catalog::new(demo_courses()).unwrap();
        catalog.sort_by_key("price-high");
        let html = catalog.render().unwrap();
        let first = html.find("Queen Rearing Masterclass").unwrap();
        let last = html.find("Urban Beekeeping Essentials").unwrap();
        assert!(first < last);
        assert!(html.contains("12.5k"));
        assert!(html.contains("$129"));
    }

    #[test]
    fn test_learner_format() {
        assert_eq!(format_learners(950), "950");
        assert_eq!(format_learners(4_000), "4k");
        assert_eq!(format_learners(15_300), "15.3k");
    }
}
