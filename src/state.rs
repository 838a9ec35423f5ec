use serde::{Deserialize, Serialize};

/// Feed group code carrying the three-way result market.
pub const GROUP_1X2: i64 = 1;

/// Feed status code the upstream uses for "not started yet".
pub const PREMATCH_STATUS_CODE: i64 = 128;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketEntry {
    pub group: i64,
    pub kind: i64,
    pub param: Option<f64>,
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiveStatus {
    pub status_code: Option<i64>,
    pub status_text: String,
    pub info_text: String,
    pub phase: String,
    pub score: Option<(u32, u32)>,
    pub minute: Option<u32>,
}

impl LiveStatus {
    pub fn total_goals(&self) -> u32 {
        self.score.map(|(h, a)| h + a).unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedEvent {
    pub id: String,
    pub home: String,
    pub away: String,
    pub league: String,
    pub start_unix: i64,
    pub live: LiveStatus,
    pub entries: Vec<MarketEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Home,
    Draw,
    Away,
}

impl Outcome {
    pub const ALL: [Outcome; 3] = [Outcome::Home, Outcome::Draw, Outcome::Away];

    pub fn from_kind(kind: i64) -> Option<Self> {
        match kind {
            1 => Some(Outcome::Home),
            2 => Some(Outcome::Draw),
            3 => Some(Outcome::Away),
            _ => None,
        }
    }

    pub fn side(self) -> Option<Side> {
        match self {
            Outcome::Home => Some(Side::Home),
            Outcome::Away => Some(Side::Away),
            Outcome::Draw => None,
        }
    }

    pub fn market_name(self, home: &str, away: &str) -> String {
        match self {
            Outcome::Home => format!("Victoire {home}"),
            Outcome::Draw => "Match nul".to_string(),
            Outcome::Away => format!("Victoire {away}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Home,
    Away,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Odds1X2 {
    pub home: Option<f64>,
    pub draw: Option<f64>,
    pub away: Option<f64>,
}

impl Odds1X2 {
    pub fn get(&self, outcome: Outcome) -> Option<f64> {
        match outcome {
            Outcome::Home => self.home,
            Outcome::Draw => self.draw,
            Outcome::Away => self.away,
        }
    }

    pub fn present(&self) -> Vec<(Outcome, f64)> {
        Outcome::ALL
            .iter()
            .filter_map(|o| self.get(*o).map(|p| (*o, p)))
            .collect()
    }
}

/// Margin-free probabilities in [0, 1]; absent outcomes carry 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ImpliedProbability {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

impl ImpliedProbability {
    pub fn get(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::Home => self.home,
            Outcome::Draw => self.draw,
            Outcome::Away => self.away,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketCategory {
    MatchResult,
    Totals,
    Handicap,
    Corners,
    Parity,
    HalfTime,
    Team,
    Other,
}

impl MarketCategory {
    pub const SECONDARY: [MarketCategory; 7] = [
        MarketCategory::Totals,
        MarketCategory::Handicap,
        MarketCategory::Corners,
        MarketCategory::Parity,
        MarketCategory::HalfTime,
        MarketCategory::Team,
        MarketCategory::Other,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TotalDirection {
    Over,
    Under,
}

/// A single wagering option. Identity is the (name, price) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub name: String,
    pub price: f64,
    pub category: MarketCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<TotalDirection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<Side>,
}

impl Market {
    pub fn new(name: impl Into<String>, price: f64, category: MarketCategory) -> Self {
        Self {
            name: name.into(),
            price,
            category,
            line: None,
            direction: None,
            team: None,
        }
    }

    pub fn with_total(mut self, direction: TotalDirection, line: f64) -> Self {
        self.direction = Some(direction);
        self.line = Some(line);
        self
    }

    pub fn with_line(mut self, line: f64) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_team(mut self, team: Side) -> Self {
        self.team = Some(team);
        self
    }

    pub fn is_over(&self) -> bool {
        match self.direction {
            Some(dir) => dir == TotalDirection::Over,
            None => {
                let n = self.name.to_lowercase();
                n.contains("plus de") || n.contains("over")
            }
        }
    }

    pub fn is_under(&self) -> bool {
        match self.direction {
            Some(dir) => dir == TotalDirection::Under,
            None => {
                let n = self.name.to_lowercase();
                n.contains("moins de") || n.contains("under")
            }
        }
    }

    /// Goal/corner threshold, falling back to the first number in the name.
    pub fn threshold(&self) -> Option<f64> {
        self.line.or_else(|| first_number(&self.name))
    }
}

fn first_number(raw: &str) -> Option<f64> {
    let mut buf = String::new();
    for ch in raw.chars() {
        if ch.is_ascii_digit() || (ch == '.' && !buf.is_empty() && !buf.contains('.')) {
            buf.push(ch);
        } else if !buf.is_empty() {
            break;
        }
    }
    buf.trim_end_matches('.').parse::<f64>().ok()
}
