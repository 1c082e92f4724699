//! Job posting domain types: the items shown in the feed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ulid::Ulid;

use crate::UserId;

/// Unique identifier for a posting, using ULID for chronological sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostingId(pub Ulid);

impl PostingId {
    /// Create a new unique posting ID.
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Parse a posting ID from a string.
    pub fn parse(s: &str) -> Result<Self, ulid::DecodeError> {
        Ok(Self(Ulid::from_string(s)?))
    }
}

impl Default for PostingId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PostingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of a feed item in the global feed order.
///
/// Feed order is `created_ms` ascending with ties broken by id, so two
/// postings created in the same millisecond still have a total order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FeedKey {
    pub created_ms: i64,
    pub id: PostingId,
}

/// A single (lat, lng) point handed to the map collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Check that the coordinates are inside the WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Rectangular map viewport used for map browsing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapBounds {
    pub south_west: GeoPoint,
    pub north_east: GeoPoint,
}

impl MapBounds {
    pub fn new(south_west: GeoPoint, north_east: GeoPoint) -> Self {
        Self {
            south_west,
            north_east,
        }
    }

    /// Check whether a point falls inside the viewport (edges inclusive).
    ///
    /// Viewports crossing the antimeridian have `south_west.lng > north_east.lng`.
    pub fn contains(&self, point: &GeoPoint) -> bool {
        let lat_ok = point.lat >= self.south_west.lat && point.lat <= self.north_east.lat;
        let lng_ok = if self.south_west.lng <= self.north_east.lng {
            point.lng >= self.south_west.lng && point.lng <= self.north_east.lng
        } else {
            point.lng >= self.south_west.lng || point.lng <= self.north_east.lng
        };
        lat_ok && lng_ok
    }
}

/// Kind of employment offered by a posting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentType {
    #[default]
    FullTime,
    PartTime,
    Contract,
    Internship,
    Temporary,
}

impl EmploymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmploymentType::FullTime => "full_time",
            EmploymentType::PartTime => "part_time",
            EmploymentType::Contract => "contract",
            EmploymentType::Internship => "internship",
            EmploymentType::Temporary => "temporary",
        }
    }
}

impl std::fmt::Display for EmploymentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Yearly salary range in whole currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalaryRange {
    pub min: u32,
    pub max: u32,
}

/// A job posting as shown in the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    /// Unique identifier for this posting.
    pub id: PostingId,
    /// Job title.
    pub title: String,
    /// Hiring company name.
    pub company: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Human-readable location, e.g. "Berlin, DE".
    #[serde(default)]
    pub location_name: String,
    /// Map point for the posting, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    /// Salary range, if advertised.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary: Option<SalaryRange>,
    #[serde(default)]
    pub employment_type: EmploymentType,
    /// Whether the role can be done fully remote.
    #[serde(default)]
    pub remote: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Cover image shown behind the card.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Dominant color extracted from the cover image (`#rrggbb`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accent_color: Option<String>,
    /// Contact address for applications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    /// User who published the posting.
    pub posted_by: UserId,
    /// When the posting was published. Drives feed order.
    pub created_at: DateTime<Utc>,
}

impl JobPosting {
    /// Create a minimal posting published now.
    pub fn new(
        title: impl Into<String>,
        company: impl Into<String>,
        posted_by: UserId,
    ) -> Self {
        Self {
            id: PostingId::new(),
            title: title.into(),
            company: company.into(),
            description: String::new(),
            location_name: String::new(),
            location: None,
            salary: None,
            employment_type: EmploymentType::default(),
            remote: false,
            tags: Vec::new(),
            image_url: None,
            accent_color: None,
            contact_email: None,
            posted_by,
            created_at: Utc::now(),
        }
    }

    /// Override the publish time.
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Set the map location for this posting.
    pub fn with_location(mut self, name: impl Into<String>, point: GeoPoint) -> Self {
        self.location_name = name.into();
        self.location = Some(point);
        self
    }

    /// Set the salary range for this posting.
    pub fn with_salary(mut self, min: u32, max: u32) -> Self {
        self.salary = Some(SalaryRange { min, max });
        self
    }

    /// Add tags to this posting.
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Ordering key of this posting within the feed.
    pub fn feed_key(&self) -> FeedKey {
        FeedKey {
            created_ms: self.created_at.timestamp_millis(),
            id: self.id,
        }
    }

    /// Check the posting against a search filter.
    pub fn matches(&self, filter: &PostingFilter) -> bool {
        if let Some(keyword) = filter.normalized_keyword() {
            let haystacks = [&self.title, &self.company, &self.location_name];
            let in_text = haystacks
                .iter()
                .any(|h| h.to_lowercase().contains(&keyword));
            let in_tags = self.tags.iter().any(|t| t.to_lowercase() == keyword);
            if !in_text && !in_tags {
                return false;
            }
        }
        if let Some(kind) = filter.employment_type
            && self.employment_type != kind
        {
            return false;
        }
        if filter.remote_only && !self.remote {
            return false;
        }
        if let Some(min) = filter.min_salary
            && self.salary.is_none_or(|s| s.max < min)
        {
            return false;
        }
        if let Some(bounds) = &filter.bounds
            && self.location.is_none_or(|p| !bounds.contains(&p))
        {
            return false;
        }
        true
    }
}

/// Search and filter options for browsing postings outside the feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostingFilter {
    /// Case-insensitive keyword matched against title, company, location and tags.
    pub keyword: Option<String>,
    pub employment_type: Option<EmploymentType>,
    pub remote_only: bool,
    /// Only postings whose advertised maximum reaches this amount.
    pub min_salary: Option<u32>,
    /// Restrict to a map viewport.
    pub bounds: Option<MapBounds>,
    pub limit: Option<usize>,
}

impl PostingFilter {
    /// Lowercased, trimmed keyword; `None` when blank.
    pub fn normalized_keyword(&self) -> Option<String> {
        self.keyword
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_lowercase)
    }
}

/// Reasons a posting draft is rejected by the publish form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("salary minimum {min} exceeds maximum {max}")]
    SalaryRange { min: u32, max: u32 },
    #[error("coordinates out of range")]
    Coordinates,
    #[error("invalid contact email")]
    Email,
    #[error("invalid accent color: {0}")]
    AccentColor(String),
}

const MAX_TITLE_LEN: usize = 120;
const MAX_COMPANY_LEN: usize = 120;
const MAX_DESCRIPTION_LEN: usize = 5_000;
const MAX_TAGS: usize = 10;

/// Input of the publish-a-job form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostingDraft {
    pub title: String,
    pub company: String,
    pub description: String,
    pub location_name: String,
    pub location: Option<GeoPoint>,
    pub salary_min: Option<u32>,
    pub salary_max: Option<u32>,
    pub employment_type: EmploymentType,
    pub remote: bool,
    pub tags: Vec<String>,
    pub image_url: Option<String>,
    pub accent_color: Option<String>,
    pub contact_email: Option<String>,
}

impl PostingDraft {
    /// Validate the draft and turn it into a posting published by `author`.
    pub fn validate(self, author: UserId) -> Result<JobPosting, ValidationError> {
        let title = required("title", &self.title, MAX_TITLE_LEN)?;
        let company = required("company", &self.company, MAX_COMPANY_LEN)?;

        let description = self.description.trim().to_string();
        if description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(ValidationError::TooLong {
                field: "description",
                max: MAX_DESCRIPTION_LEN,
            });
        }

        if let Some(point) = &self.location
            && !point.is_valid()
        {
            return Err(ValidationError::Coordinates);
        }

        let salary = match (self.salary_min, self.salary_max) {
            (Some(min), Some(max)) if min > max => {
                return Err(ValidationError::SalaryRange { min, max });
            }
            (Some(min), Some(max)) => Some(SalaryRange { min, max }),
            (Some(v), None) | (None, Some(v)) => Some(SalaryRange { min: v, max: v }),
            (None, None) => None,
        };

        let contact_email = non_blank(self.contact_email);
        if let Some(email) = &contact_email
            && !looks_like_email(email)
        {
            return Err(ValidationError::Email);
        }

        let accent_color = non_blank(self.accent_color);
        if let Some(color) = &accent_color
            && !is_hex_color(color)
        {
            return Err(ValidationError::AccentColor(color.clone()));
        }

        let mut tags: Vec<String> = Vec::new();
        for tag in self.tags.iter().map(|t| t.trim().to_lowercase()) {
            if !tag.is_empty() && !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        tags.truncate(MAX_TAGS);

        let mut posting = JobPosting::new(title, company, author);
        posting.description = description;
        posting.location_name = self.location_name.trim().to_string();
        posting.location = self.location;
        posting.salary = salary;
        posting.employment_type = self.employment_type;
        posting.remote = self.remote;
        posting.tags = tags;
        posting.image_url = non_blank(self.image_url);
        posting.accent_color = accent_color;
        posting.contact_email = contact_email;
        Ok(posting)
    }
}

fn required(field: &'static str, value: &str, max: usize) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Missing(field));
    }
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(value.to_string())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    }
}

fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn author() -> UserId {
        UserId::parse("author-1").unwrap()
    }

    #[test]
    fn draft_trims_and_dedupes_tags() {
        let draft = PostingDraft {
            title: "  Backend Engineer ".into(),
            company: "Acme".into(),
            tags: vec!["Rust".into(), "rust".into(), " ".into(), "async".into()],
            salary_min: Some(60_000),
            ..Default::default()
        };

        let posting = draft.validate(author()).unwrap();
        assert_eq!(posting.title, "Backend Engineer");
        assert_eq!(posting.tags, vec!["rust".to_string(), "async".to_string()]);
        assert_eq!(posting.salary, Some(SalaryRange { min: 60_000, max: 60_000 }));
    }

    #[test]
    fn draft_rejects_bad_input() {
        let missing = PostingDraft {
            company: "Acme".into(),
            ..Default::default()
        };
        assert_eq!(
            missing.validate(author()),
            Err(ValidationError::Missing("title"))
        );

        let inverted = PostingDraft {
            title: "Chef".into(),
            company: "Bistro".into(),
            salary_min: Some(50),
            salary_max: Some(10),
            ..Default::default()
        };
        assert!(matches!(
            inverted.validate(author()),
            Err(ValidationError::SalaryRange { .. })
        ));

        let off_map = PostingDraft {
            title: "Chef".into(),
            company: "Bistro".into(),
            location: Some(GeoPoint::new(91.0, 0.0)),
            ..Default::default()
        };
        assert_eq!(off_map.validate(author()), Err(ValidationError::Coordinates));

        let email = PostingDraft {
            title: "Chef".into(),
            company: "Bistro".into(),
            contact_email: Some("nobody".into()),
            ..Default::default()
        };
        assert_eq!(email.validate(author()), Err(ValidationError::Email));
    }

    #[test]
    fn bounds_handle_antimeridian() {
        let pacific = MapBounds::new(GeoPoint::new(-10.0, 170.0), GeoPoint::new(10.0, -170.0));
        assert!(pacific.contains(&GeoPoint::new(0.0, 179.0)));
        assert!(pacific.contains(&GeoPoint::new(0.0, -175.0)));
        assert!(!pacific.contains(&GeoPoint::new(0.0, 0.0)));
    }

    #[test]
    fn filter_matches_keyword_and_salary() {
        let posting = JobPosting::new("Rust Developer", "Ferris Inc", author())
            .with_salary(40_000, 70_000)
            .with_tags(vec!["backend".into()]);

        let by_title = PostingFilter {
            keyword: Some(" rust ".into()),
            ..Default::default()
        };
        assert!(posting.matches(&by_title));

        let by_tag = PostingFilter {
            keyword: Some("Backend".into()),
            ..Default::default()
        };
        assert!(posting.matches(&by_tag));

        let too_rich = PostingFilter {
            min_salary: Some(80_000),
            ..Default::default()
        };
        assert!(!posting.matches(&too_rich));

        let remote = PostingFilter {
            remote_only: true,
            ..Default::default()
        };
        assert!(!posting.matches(&remote));
    }

    #[test]
    fn feed_key_orders_by_time_then_id() {
        let t = Utc::now();
        let a = JobPosting::new("a", "x", author()).with_created_at(t);
        let b = JobPosting::new("b", "x", author()).with_created_at(t);
        let later = JobPosting::new("c", "x", author())
            .with_created_at(t + chrono::Duration::milliseconds(1));

        assert_eq!(a.feed_key() < b.feed_key(), a.id < b.id);
        assert!(a.feed_key() < later.feed_key());
        assert!(b.feed_key() < later.feed_key());
    }
}
