//! Client (brand) records.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Closed set of industry categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Industry {
    Technology,
    Healthcare,
    Finance,
    Retail,
    Education,
    Hospitality,
    RealEstate,
    Entertainment,
    FoodBeverage,
    Fashion,
    Automotive,
    Manufacturing,
    Consulting,
    Marketing,
    #[default]
    Other,
}

impl Industry {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "technology" => Some(Industry::Technology),
            "healthcare" => Some(Industry::Healthcare),
            "finance" => Some(Industry::Finance),
            "retail" => Some(Industry::Retail),
            "education" => Some(Industry::Education),
            "hospitality" => Some(Industry::Hospitality),
            "real_estate" => Some(Industry::RealEstate),
            "entertainment" => Some(Industry::Entertainment),
            "food_beverage" => Some(Industry::FoodBeverage),
            "fashion" => Some(Industry::Fashion),
            "automotive" => Some(Industry::Automotive),
            "manufacturing" => Some(Industry::Manufacturing),
            "consulting" => Some(Industry::Consulting),
            "marketing" => Some(Industry::Marketing),
            "other" => Some(Industry::Other),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Industry::Technology => "technology",
            Industry::Healthcare => "healthcare",
            Industry::Finance => "finance",
            Industry::Retail => "retail",
            Industry::Education => "education",
            Industry::Hospitality => "hospitality",
            Industry::RealEstate => "real_estate",
            Industry::Entertainment => "entertainment",
            Industry::FoodBeverage => "food_beverage",
            Industry::Fashion => "fashion",
            Industry::Automotive => "automotive",
            Industry::Manufacturing => "manufacturing",
            Industry::Consulting => "consulting",
            Industry::Marketing => "marketing",
            Industry::Other => "other",
        }
    }
}

impl fmt::Display for Industry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tracked social profile URLs (at most these six platforms).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SocialLinks {
    pub facebook_url: Option<String>,
    pub instagram_url: Option<String>,
    pub youtube_url: Option<String>,
    pub linkedin_url: Option<String>,
    pub twitter_url: Option<String>,
    pub tiktok_url: Option<String>,
}

impl SocialLinks {
    /// Platforms that have a URL configured.
    pub fn active_platforms(&self) -> Vec<&'static str> {
        let mut platforms = Vec::new();
        if self.facebook_url.is_some() {
            platforms.push("facebook");
        }
        if self.instagram_url.is_some() {
            platforms.push("instagram");
        }
        if self.youtube_url.is_some() {
            platforms.push("youtube");
        }
        if self.linkedin_url.is_some() {
            platforms.push("linkedin");
        }
        if self.twitter_url.is_some() {
            platforms.push("twitter");
        }
        if self.tiktok_url.is_some() {
            platforms.push("tiktok");
        }
        platforms
    }
}

/// A brand/contact record owned by a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: i64,
    pub user_id: Uuid,
    pub client_name: String,
    pub industry: Industry,
    pub contact_person: String,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    #[serde(flatten)]
    pub social: SocialLinks,
    /// Preferred time of day for posting content
    pub preferred_post_time: Option<NaiveTime>,
    /// Path to the stored brand logo, if uploaded
    pub logo_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_industry_roundtrip() {
        for name in [
            "technology",
            "healthcare",
            "finance",
            "retail",
            "education",
            "hospitality",
            "real_estate",
            "entertainment",
            "food_beverage",
            "fashion",
            "automotive",
            "manufacturing",
            "consulting",
            "marketing",
            "other",
        ] {
            let industry = Industry::parse(name).expect(name);
            assert_eq!(industry.as_str(), name);
        }
        assert_eq!(Industry::parse("aerospace"), None);
    }

    #[test]
    fn test_active_platforms() {
        let social = SocialLinks {
            instagram_url: Some("https://instagram.com/acme".to_string()),
            tiktok_url: Some("https://tiktok.com/@acme".to_string()),
            ..Default::default()
        };
        assert_eq!(social.active_platforms(), vec!["instagram", "tiktok"]);
    }
}
