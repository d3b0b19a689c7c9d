use chrono::{DateTime, Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum CoffeeType {
    Capsula,
    Expresso,
    Especialidad,
    CafeFrio,
    Starbucks,
    Filtrado,
    // Unknown tags from older records land on the default category.
    // `#[serde(other)]` requires this variant to be declared last.
    #[default]
    #[serde(other)]
    Instantaneo,
}

impl CoffeeType {
    pub const ALL: [CoffeeType; 7] = [
        CoffeeType::Instantaneo,
        CoffeeType::Capsula,
        CoffeeType::Expresso,
        CoffeeType::Especialidad,
        CoffeeType::CafeFrio,
        CoffeeType::Starbucks,
        CoffeeType::Filtrado,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            CoffeeType::Instantaneo => "Instantáneo",
            CoffeeType::Capsula => "Cápsula",
            CoffeeType::Expresso => "Expresso",
            CoffeeType::Especialidad => "Especialidad",
            CoffeeType::CafeFrio => "Café Frío",
            CoffeeType::Starbucks => "Starbucks",
            CoffeeType::Filtrado => "Café Filtrado",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Cinnamoroll,
    Hellokitty,
    Kuromi,
    Keroppi,
    // `#[serde(other)]` requires this variant to be declared last.
    #[default]
    #[serde(other)]
    Pompompurin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoffeeEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: CoffeeType,
    pub timestamp: DateTime<Local>,
    // Logical day the coffee counts toward, "YYYY-MM-DD". Absent on older
    // records, in which case the timestamp's local day stands in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl CoffeeEntry {
    pub fn new(kind: CoffeeType, date: Option<String>, notes: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            timestamp: Local::now(),
            date,
            notes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoffeeData {
    pub entries: Vec<CoffeeEntry>,
    pub username: String,
    pub created_at: DateTime<Local>,
}

impl CoffeeData {
    pub fn new(username: impl Into<String>, created_at: DateTime<Local>) -> Self {
        Self {
            entries: Vec::new(),
            username: username.into(),
            created_at,
        }
    }

    pub fn push(&mut self, entry: CoffeeEntry) {
        self.entries.push(entry);
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        self.entries.len() != before
    }

    pub fn entries_on(&self, day: NaiveDate) -> Vec<CoffeeEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.timestamp.date_naive() == day)
            .cloned()
            .collect()
    }

    pub fn entries_in_month(&self, year: i32, month: u32) -> Vec<CoffeeEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.timestamp.year() == year && entry.timestamp.month() == month)
            .cloned()
            .collect()
    }
}

// The unit the sync adapter moves, one record per username.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub data: CoffeeData,
    #[serde(default)]
    pub theme: Theme,
    pub updated_at: DateTime<Local>,
}

#[derive(Debug, Deserialize)]
pub struct UserRequest {
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<CoffeeData>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub username: String,
    pub created_at: DateTime<Local>,
    pub entry_count: usize,
    pub theme: Theme,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<DateTime<Local>>,
}

#[derive(Debug, Deserialize)]
pub struct AddCoffeeRequest {
    #[serde(rename = "type")]
    pub kind: CoffeeType,
    pub date: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ThemeRequest {
    pub theme: Theme,
}

#[derive(Debug, Serialize)]
pub struct ThemeResponse {
    pub theme: Theme,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeRange {
    #[default]
    All,
    #[serde(rename = "30days")]
    Last30Days,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub today: u64,
    pub month: u64,
    pub year: u64,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub today: u64,
    pub month: u64,
    pub year: u64,
    pub streak: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedEntry {
    pub id: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyPattern {
    pub counts: [u64; 7],
    pub heights: [f64; 7],
    pub skipped: Vec<SkippedEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyEvolution {
    pub months: Vec<String>,
    pub counts: Vec<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TimeSlot {
    pub count: u64,
    pub percent: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TimeDistribution {
    pub morning: TimeSlot,
    pub afternoon: TimeSlot,
    pub night: TimeSlot,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecordsSummary {
    pub streak: u32,
    pub max_per_day: u64,
    pub total: u64,
}

#[derive(Debug, Serialize)]
pub struct HabitsResponse {
    pub range: TimeRange,
    pub weekly_pattern: WeeklyPattern,
    pub monthly_evolution: MonthlyEvolution,
    pub time_distribution: TimeDistribution,
    pub by_type: BTreeMap<CoffeeType, u64>,
    pub records: RecordsSummary,
}
