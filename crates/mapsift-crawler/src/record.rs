use serde::{Deserialize, Serialize};

/// Placeholder for any missing or empty field.
pub const SENTINEL: &str = "NA";

pub const FIELD_COUNT: usize = 13;

/// Column names, in [`PlaceRecord`] field order.
pub const DEFAULT_HEADERS: [&str; FIELD_COUNT] = [
    "Name",
    "Address",
    "Instagram",
    "Facebook",
    "Website",
    "Plus Code",
    "Source URL",
    "Other Links",
    "Phone",
    "Business Category",
    "Place Type",
    "Review Stars",
    "Review Count",
];

/// One unit of work: a category searched in a location.
///
/// `location` goes verbatim into the search query while `batch_key` names
/// the checkpoint file and the sheet. Escaping the location into a safe
/// batch key is up to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CrawlTarget {
    category: String,
    location: String,
    batch_key: String,
}

impl CrawlTarget {
    pub fn new(
        category: impl Into<String>,
        location: impl Into<String>,
        batch_key: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            location: location.into(),
            batch_key: batch_key.into(),
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn batch_key(&self) -> &str {
        &self.batch_key
    }

    pub fn query(&self) -> String {
        format!("{} in {}", self.category, self.location)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SocialLinks {
    pub instagram: String,
    pub facebook: String,
    pub other: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkSlot {
    Instagram,
    Facebook,
    Other,
}

impl LinkSlot {
    pub fn classify(url: &str) -> Self {
        if url.contains("instagram.com") {
            Self::Instagram
        } else if url.contains("facebook.com") {
            Self::Facebook
        } else {
            Self::Other
        }
    }
}

impl SocialLinks {
    /// Files `url` under its slot and returns the slot it was classified in.
    ///
    /// The first URL of a social slot keeps it, later ones are dropped.
    pub fn absorb(&mut self, url: String) -> LinkSlot {
        let slot = LinkSlot::classify(&url);
        let target = match slot {
            LinkSlot::Instagram => &mut self.instagram,
            LinkSlot::Facebook => &mut self.facebook,
            LinkSlot::Other => {
                self.other.push(url);
                return slot;
            }
        };
        if target.is_empty() {
            *target = url;
        } else {
            log::debug!("Ignoring extra {slot:?} link {url}, keeping {target}");
        }
        slot
    }

    pub fn joined_other(&self) -> String {
        self.other.join(", ")
    }
}

/// The thirteen columns written for each listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceRecord {
    pub name: String,
    pub address: String,
    pub instagram: String,
    pub facebook: String,
    pub website: String,
    pub plus_code: String,
    pub source_url: String,
    pub other_links: String,
    pub phone: String,
    pub business_category: String,
    pub place_type: String,
    pub review_stars: String,
    pub review_count: String,
}

impl PlaceRecord {
    pub fn into_row(self) -> Vec<String> {
        vec![
            self.name,
            self.address,
            self.instagram,
            self.facebook,
            self.website,
            self.plus_code,
            self.source_url,
            self.other_links,
            self.phone,
            self.business_category,
            self.place_type,
            self.review_stars,
            self.review_count,
        ]
    }

    fn fields_mut(&mut self) -> [&mut String; FIELD_COUNT] {
        [
            &mut self.name,
            &mut self.address,
            &mut self.instagram,
            &mut self.facebook,
            &mut self.website,
            &mut self.plus_code,
            &mut self.source_url,
            &mut self.other_links,
            &mut self.phone,
            &mut self.business_category,
            &mut self.place_type,
            &mut self.review_stars,
            &mut self.review_count,
        ]
    }

    /// Replaces every empty field with [`SENTINEL`]. Idempotent.
    pub fn sanitize(mut self) -> Self {
        for field in self.fields_mut() {
            if field.trim().is_empty() {
                *field = SENTINEL.to_string();
            }
        }
        self
    }
}

/// Maps a missing value to the sentinel.
pub fn or_sentinel(value: Option<String>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => SENTINEL.to_string(),
    }
}

/// Strips the enclosing parentheses off a review count such as `(1,234)`.
///
/// Listings with a single review render stars but no count, so a missing
/// count next to a star rating becomes `"1"`.
pub fn normalize_review_count(raw: &str, stars: &str) -> String {
    let count = raw.replace(['(', ')'], "");
    let count = count.trim();
    if count.is_empty() || count == SENTINEL {
        if stars != SENTINEL && !stars.trim().is_empty() {
            "1".to_string()
        } else {
            SENTINEL.to_string()
        }
    } else {
        count.to_string()
    }
}
