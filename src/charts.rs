//! Chart configurations handed to the browser's charting library.
//!
//! Configs are plain data in the library's JSON shape (`type`, `data`,
//! `options`). The server decides per chart slot whether the browser gets a
//! config or a fallback message; the library itself never sees bad input.

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use std::str::FromStr;

const BRAND: &str = "#A435F0";
const BRAND_FILL: &str = "rgba(164, 53, 240, 0.1)";
const BRAND_AREA: &str = "rgba(164, 53, 240, 0.2)";

/// Shown in a chart slot when the charting library is not served
pub const LIBRARY_UNAVAILABLE: &str = "Chart.js failed to load";
/// Shown in a chart slot whose config has nothing to draw
pub const DATA_MISSING: &str = "Chart data is missing";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Bar,
    Doughnut,
    Pie,
    Radar,
}

/// One colour for the whole dataset, or one per slice
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Palette {
    Single(String),
    PerValue(Vec<String>),
}

impl Palette {
    fn single(color: &str) -> Self {
        Palette::Single(color.to_string())
    }

    fn per_value(colors: &[&str]) -> Self {
        Palette::PerValue(colors.iter().map(|c| c.to_string()).collect())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub data: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<Palette>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tension: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartConfig {
    #[serde(rename = "type")]
    pub kind: ChartKind,
    pub data: ChartData,
    pub options: Value,
}

impl ChartConfig {
    fn new(kind: ChartKind, labels: &[&str], datasets: Vec<Dataset>, options: Value) -> Self {
        Self {
            kind,
            data: ChartData {
                labels: labels.iter().map(|l| l.to_string()).collect(),
                datasets,
            },
            options,
        }
    }

    /// Whether there is anything to draw
    ///
    /// Every dataset needs one value per label.
    pub fn has_data(&self) -> bool {
        !self.data.labels.is_empty()
            && !self.data.datasets.is_empty()
            && self
                .data
                .datasets
                .iter()
                .all(|d| d.data.len() == self.data.labels.len())
    }
}

/// A named place on a page where a chart goes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSlot {
    /// Id of the canvas element
    pub canvas: &'static str,
    pub title: &'static str,
    pub config: Option<ChartConfig>,
}

/// What the browser is told to do with a chart slot
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mount", content = "value", rename_all = "lowercase")]
pub enum ChartMount {
    /// The page has no such slot
    Skipped,
    Config(ChartConfig),
    /// Static message instead of a chart
    Fallback(&'static str),
}

impl ChartMount {
    /// Decide how a slot gets mounted
    ///
    /// # Arguments
    /// * `slot_present` - Whether the page contains the canvas
    /// * `library_available` - Whether the charting library is served
    /// * `config` - The config meant for the slot
    pub fn decide(slot_present: bool, library_available: bool, config: Option<ChartConfig>) -> Self {
        if !slot_present {
            return ChartMount::Skipped;
        }
        if !library_available {
            return ChartMount::Fallback(LIBRARY_UNAVAILABLE);
        }
        match config {
            Some(config) if config.has_data() => ChartMount::Config(config),
            _ => ChartMount::Fallback(DATA_MISSING),
        }
    }
}

/// Time range of the daily activity chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Period {
    #[default]
    #[serde(rename = "7d")]
    SevenDays,
    #[serde(rename = "30d")]
    ThirtyDays,
    #[serde(rename = "90d")]
    NinetyDays,
    #[serde(rename = "1y")]
    Year,
    #[serde(rename = "all")]
    All,
}

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];
const WEEK_SERIES: [f64; 7] = [2.5, 3.2, 1.8, 4.1, 2.9, 3.7, 2.3];
const MONTH_SERIES: [f64; 30] = [
    2.5, 3.2, 1.8, 4.1, 2.9, 3.7, 2.3, 3.5, 2.8, 4.2, 3.1, 2.7, 3.9, 2.4, 3.6, 2.1, 3.8, 2.6, 4.0,
    3.3, 2.9, 3.4, 2.2, 3.7, 2.8, 4.1, 3.0, 2.5, 3.6, 2.9,
];

impl Period {
    pub const ALL: [Period; 5] = [
        Period::SevenDays,
        Period::ThirtyDays,
        Period::NinetyDays,
        Period::Year,
        Period::All,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::SevenDays => "7d",
            Period::ThirtyDays => "30d",
            Period::NinetyDays => "90d",
            Period::Year => "1y",
            Period::All => "all",
        }
    }

    /// Number of points on the x axis
    pub fn points(&self) -> usize {
        match self {
            Period::SevenDays => 7,
            Period::ThirtyDays => 30,
            Period::NinetyDays => 90,
            Period::Year => 12,
            Period::All => 24,
        }
    }

    pub fn labels(&self) -> Vec<String> {
        match self {
            Period::SevenDays => WEEKDAYS.iter().map(|d| d.to_string()).collect(),
            Period::ThirtyDays => (1..=30).map(|i| format!("Day {}", i)).collect(),
            Period::NinetyDays => (0..90).map(|i| format!("Week {}", i / 7 + 1)).collect(),
            Period::Year => MONTHS.iter().map(|m| m.to_string()).collect(),
            Period::All => (1..=24).map(|i| format!("Month {}", i)).collect(),
        }
    }

    /// Hours learned per point; longer ranges are generated
    pub fn activity<R: Rng>(&self, rng: &mut R) -> Vec<f64> {
        match self {
            Period::SevenDays => WEEK_SERIES.to_vec(),
            Period::ThirtyDays => MONTH_SERIES.to_vec(),
            _ => (0..self.points()).map(|_| rng.gen_range(1.0..5.0)).collect(),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPeriod(pub String);

impl fmt::Display for UnknownPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown period '{}'", self.0)
    }
}

impl FromStr for Period {
    type Err = UnknownPeriod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Period::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownPeriod(s.to_string()))
    }
}

/// Time filter of the dashboard charts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DashboardRange {
    #[default]
    Week,
    Month,
    Year,
}

impl DashboardRange {
    pub const ALL: [DashboardRange; 3] =
        [DashboardRange::Week, DashboardRange::Month, DashboardRange::Year];

    pub fn as_str(&self) -> &'static str {
        match self {
            DashboardRange::Week => "week",
            DashboardRange::Month => "month",
            DashboardRange::Year => "year",
        }
    }

    /// Average hours per weekday
    fn weekly(&self) -> [f64; 7] {
        match self {
            DashboardRange::Week => [2.5, 3.2, 1.8, 4.1, 2.9, 3.5, 2.1],
            DashboardRange::Month => [3.1, 2.8, 4.2, 3.5, 2.9, 3.8, 2.4],
            DashboardRange::Year => [4.2, 3.8, 5.1, 4.5, 3.9, 4.8, 3.2],
        }
    }

    /// Share of time per category, in percent
    fn categories(&self) -> [f64; 5] {
        match self {
            DashboardRange::Week => [35.0, 25.0, 20.0, 15.0, 5.0],
            DashboardRange::Month => [40.0, 20.0, 25.0, 10.0, 5.0],
            DashboardRange::Year => [45.0, 15.0, 30.0, 8.0, 2.0],
        }
    }

    fn skills(&self) -> [f64; 6] {
        match self {
            DashboardRange::Week => [85.0, 70.0, 60.0, 45.0, 30.0, 80.0],
            DashboardRange::Month => [90.0, 75.0, 65.0, 50.0, 35.0, 85.0],
            DashboardRange::Year => [95.0, 85.0, 80.0, 70.0, 60.0, 90.0],
        }
    }
}

fn legend_bottom() -> Value {
    json!({
        "responsive": true,
        "maintainAspectRatio": false,
        "plugins": { "legend": { "position": "bottom", "labels": { "usePointStyle": true, "padding": 20 } } }
    })
}

fn line_options(max: Option<f64>) -> Value {
    let mut y = json!({ "beginAtZero": true, "ticks": { "stepSize": 1 } });
    if let Some(max) = max {
        y["max"] = json!(max);
    }
    json!({
        "responsive": true,
        "maintainAspectRatio": false,
        "plugins": { "legend": { "display": false } },
        "scales": { "y": y, "x": { "grid": { "display": false } } },
        "elements": { "point": { "hoverRadius": 8 } }
    })
}

fn radar_options() -> Value {
    json!({
        "responsive": true,
        "maintainAspectRatio": false,
        "plugins": { "legend": { "display": false } },
        "scales": { "r": { "beginAtZero": true, "max": 100, "ticks": { "stepSize": 20 } } }
    })
}

fn line_dataset(label: &str, data: Vec<f64>) -> Dataset {
    Dataset {
        label: Some(label.to_string()),
        data,
        background_color: Some(Palette::single(BRAND_FILL)),
        border_color: Some(BRAND.to_string()),
        border_width: Some(3),
        fill: Some(true),
        tension: Some(0.4),
    }
}

fn area_dataset(label: &str, data: &[f64]) -> Dataset {
    Dataset {
        label: Some(label.to_string()),
        data: data.to_vec(),
        background_color: Some(Palette::single(BRAND_AREA)),
        border_color: Some(BRAND.to_string()),
        border_width: Some(2),
        ..Dataset::default()
    }
}

fn sliced_dataset(label: Option<&str>, data: &[f64], colors: &[&str]) -> Dataset {
    Dataset {
        label: label.map(str::to_string),
        data: data.to_vec(),
        background_color: Some(Palette::per_value(colors)),
        border_width: Some(0),
        ..Dataset::default()
    }
}

// Dashboard

pub fn weekly_progress(range: DashboardRange) -> ChartConfig {
    ChartConfig::new(
        ChartKind::Line,
        &WEEKDAYS,
        vec![line_dataset(
            "Hours Spent on Hive Management",
            range.weekly().to_vec(),
        )],
        line_options(Some(5.0)),
    )
}

pub fn category_breakdown(range: DashboardRange) -> ChartConfig {
    ChartConfig::new(
        ChartKind::Doughnut,
        &[
            "Hive Management",
            "Honey Production",
            "Disease Prevention",
            "Queen Rearing",
            "Equipment Maintenance",
        ],
        vec![sliced_dataset(
            None,
            &range.categories(),
            &[BRAND, "#667eea", "#28A745", "#FFC107", "#17A2B8"],
        )],
        legend_bottom(),
    )
}

pub fn skill_radar(range: DashboardRange) -> ChartConfig {
    ChartConfig::new(
        ChartKind::Radar,
        &[
            "Hive Inspection",
            "Swarm Management",
            "Honey Extraction",
            "Queen Identification",
            "Disease Recognition",
            "Equipment Handling",
        ],
        vec![area_dataset("Current Skills", &range.skills())],
        radar_options(),
    )
}

// Analytics

pub fn daily_activity<R: Rng>(period: Period, rng: &mut R) -> ChartConfig {
    let labels = period.labels();
    ChartConfig {
        kind: ChartKind::Line,
        data: ChartData {
            labels,
            datasets: vec![line_dataset("Hours Learned", period.activity(rng))],
        },
        options: line_options(None),
    }
}

pub fn completion_rate() -> ChartConfig {
    ChartConfig::new(
        ChartKind::Bar,
        &[
            "Hive Management",
            "Bee Biology",
            "Honey Production",
            "Equipment Safety",
            "Disease Control",
        ],
        vec![sliced_dataset(
            Some("Completion %"),
            &[85.0, 72.0, 68.0, 91.0, 78.0],
            &["#a435f0", "#1fbd6a", "#0073b1", "#f69c08", "#d41b2c"],
        )],
        json!({
            "responsive": true,
            "maintainAspectRatio": false,
            "plugins": { "legend": { "display": false } },
            "scales": { "y": { "beginAtZero": true, "max": 100 } }
        }),
    )
}

pub fn time_distribution() -> ChartConfig {
    ChartConfig::new(
        ChartKind::Doughnut,
        &[
            "Hive Management",
            "Honey Production",
            "Queen Rearing",
            "Bee Health",
        ],
        vec![sliced_dataset(
            Some("Hours Spent"),
            &[42.0, 31.0, 19.0, 8.0],
            &[BRAND, "#667eea", "#28A745", "#FFC107"],
        )],
        legend_bottom(),
    )
}

pub fn quiz_performance() -> ChartConfig {
    ChartConfig::new(
        ChartKind::Radar,
        &[
            "Hive Management",
            "Bee Biology",
            "Honey Production",
            "Disease Control",
            "Queen Rearing",
            "Equipment Safety",
        ],
        vec![area_dataset(
            "Quiz Scores",
            &[92.0, 88.0, 95.0, 85.0, 78.0, 90.0],
        )],
        radar_options(),
    )
}

pub fn assignment_completion() -> ChartConfig {
    ChartConfig::new(
        ChartKind::Pie,
        &["On Time", "Late", "Not Submitted"],
        vec![sliced_dataset(
            None,
            &[89.0, 8.0, 3.0],
            &["#1fbd6a", "#f69c08", "#d41b2c"],
        )],
        legend_bottom(),
    )
}

pub fn dashboard_charts(range: DashboardRange) -> Vec<ChartSlot> {
    vec![
        ChartSlot {
            canvas: "weeklyProgressChart",
            title: "Weekly Progress",
            config: Some(weekly_progress(range)),
        },
        ChartSlot {
            canvas: "categoryChart",
            title: "Learning Categories",
            config: Some(category_breakdown(range)),
        },
        ChartSlot {
            canvas: "skillRadarChart",
            title: "Skill Assessment",
            config: Some(skill_radar(range)),
        },
    ]
}

pub fn analytics_charts<R: Rng>(period: Period, rng: &mut R) -> Vec<ChartSlot> {
    vec![
        ChartSlot {
            canvas: "dailyActivityChart",
            title: "Daily Learning Activity",
            config: Some(daily_activity(period, rng)),
        },
        ChartSlot {
            canvas: "completionRateChart",
            title: "Course Completion Rate",
            config: Some(completion_rate()),
        },
        ChartSlot {
            canvas: "timeDistributionChart",
            title: "Time Distribution",
            config: Some(time_distribution()),
        },
        ChartSlot {
            canvas: "quizPerformanceChart",
            title: "Quiz Performance",
            config: Some(quiz_performance()),
        },
        ChartSlot {
            canvas: "assignmentChart",
            title: "Assignment Completion",
            config: Some(assignment_completion()),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_period_labels_match_values() {
        let mut rng = StdRng::seed_from_u64(3);
        for period in Period::ALL {
            let config = daily_activity(period, &mut rng);
            assert_eq!(config.data.labels.len(), period.points(), "{}", period);
            assert_eq!(config.data.datasets[0].data.len(), period.points(), "{}", period);
            assert!(config.has_data());
        }
    }

    #[test]
    fn test_generated_values_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(11);
        for period in [Period::NinetyDays, Period::Year, Period::All] {
            assert!(period.activity(&mut rng).iter().all(|v| (1.0..5.0).contains(v)));
        }
        assert_eq!(Period::SevenDays.activity(&mut rng), WEEK_SERIES.to_vec());
    }

    #[test]
    fn test_period_parsing() {
        assert_eq!("90d".parse::<Period>(), Ok(Period::NinetyDays));
        assert_eq!("all".parse::<Period>(), Ok(Period::All));
        assert!("2w".parse::<Period>().is_err());
        assert_eq!(Period::default(), Period::SevenDays);
        assert_eq!(Period::NinetyDays.labels()[7], "Week 2");
    }

    #[test]
    fn test_config_wire_shape() {
        let json = serde_json::to_value(weekly_progress(DashboardRange::Week)).unwrap();
        assert_eq!(json["type"], "line");
        assert_eq!(json["data"]["labels"][0], "Mon");
        assert_eq!(json["data"]["datasets"][0]["borderColor"], BRAND);
        assert_eq!(json["options"]["scales"]["y"]["max"], 5.0);

        let json = serde_json::to_value(assignment_completion()).unwrap();
        assert_eq!(json["type"], "pie");
        assert_eq!(json["data"]["datasets"][0]["backgroundColor"][2], "#d41b2c");
        assert!(json["data"]["datasets"][0].get("label").is_none());
    }

    #[test]
    fn test_mount_decisions() {
        assert_eq!(
            ChartMount::decide(false, true, Some(skill_radar(DashboardRange::Week))),
            ChartMount::Skipped
        );
        assert_eq!(
            ChartMount::decide(true, false, Some(skill_radar(DashboardRange::Week))),
            ChartMount::Fallback(LIBRARY_UNAVAILABLE)
        );
        assert_eq!(
            ChartMount::decide(true, true, None),
            ChartMount::Fallback(DATA_MISSING)
        );

        let mut empty = time_distribution();
        empty.data.datasets[0].data.clear();
        assert_eq!(
            ChartMount::decide(true, true, Some(empty)),
            ChartMount::Fallback(DATA_MISSING)
        );
        assert!(matches!(
            ChartMount::decide(true, true, Some(quiz_performance())),
            ChartMount::Config(_)
        ));
    }

    #[test]
    fn test_mount_wire_shape() {
        let json = serde_json::to_value(ChartMount::Fallback(DATA_MISSING)).unwrap();
        assert_eq!(json["mount"], "fallback");
        assert_eq!(json["value"], DATA_MISSING);
    }

    #[test]
    fn test_page_presets() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(dashboard_charts(DashboardRange::default()).len(), 3);
        let analytics = analytics_charts(Period::Year, &mut rng);
        assert_eq!(analytics.len(), 5);
        assert!(analytics.iter().all(|slot| slot.config.as_ref().is_some_and(ChartConfig::has_data)));
    }

    #[test]
    fn test_dashboard_ranges_change_every_chart() {
        let week = dashboard_charts(DashboardRange::Week);
        let year = dashboard_charts(DashboardRange::Year);
        for (w, y) in week.iter().zip(&year) {
            assert_eq!(w.canvas, y.canvas);
            let (w, y) = (w.config.as_ref().unwrap(), y.config.as_ref().unwrap());
            assert!(w.has_data() && y.has_data());
            assert_ne!(w.data.datasets[0].data, y.data.datasets[0].data);
        }
        let month = weekly_progress(DashboardRange::Month);
        assert_eq!(month.data.datasets[0].data[2], 4.2);
        assert_eq!(
            serde_json::from_str::<DashboardRange>("\"year\"").unwrap(),
            DashboardRange::Year
        );
    }
}
