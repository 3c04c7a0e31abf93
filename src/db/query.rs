use std::time::SystemTime;

use diesel::prelude::*;
use diesel::pg::Pg;

use super::schema::help_requests::{self, dsl as hr_dsl};
use crate::geo::BoundingBox;


pub type BoxedHelpRequests = help_requests::BoxedQuery<'static, Pg>;

const DEFAULT_ORDERING: [Ordering; 1] = [Ordering::asc(OrderField::MeetingDatetime)];


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderField {
    MeetingDatetime,
    Datetime,
    Title,
    LocationName,
    Id,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ordering {
    pub field: OrderField,
    pub descending: bool,
}

impl Ordering {
    pub const fn asc(field: OrderField) -> Self {
        Ordering { field, descending: false }
    }

    /// Parses `"-meeting_datetime,title"` style lists. Unknown fields are skipped.
    pub fn parse_list(value: &str) -> Vec<Ordering> {
        value.split(',')
            .map(str::trim)
            .filter_map(|term| {
                let (descending, name) = if term.starts_with('-') {
                    (true, &term[1..])
                }
                else {
                    (false, term)
                };

                let field = match name {
                    "meeting_datetime" => OrderField::MeetingDatetime,
                    "datetime" => OrderField::Datetime,
                    "title" => OrderField::Title,
                    "location_name" => OrderField::LocationName,
                    "id" => OrderField::Id,
                    _ => return None,
                };

                Some(Ordering { field, descending })
            })
            .collect()
    }
}


/// Chainable filter over help requests, rendered to SQL by
/// [`HelpRequestQuery::to_boxed`].
#[derive(Debug, Clone, Default)]
pub struct HelpRequestQuery {
    location: Option<BoundingBox>,
    not_closed: bool,
    meeting_after: Option<SystemTime>,
    search_terms: Vec<String>,
    ordering: Vec<Ordering>,
}

impl HelpRequestQuery {
    pub fn all() -> Self {
        HelpRequestQuery::default()
    }

    /// Only requests whose meeting point lies inside `bbox`. Requests
    /// without a stored location never match.
    pub fn location(mut self, bbox: BoundingBox) -> Self {
        self.location = Some(bbox);
        self
    }

    pub fn not_closed(mut self) -> Self {
        self.not_closed = true;
        self
    }

    /// Meetings strictly after the current time, captured now.
    pub fn only_future_meetings(self) -> Self {
        self.meeting_after(SystemTime::now())
    }

    pub fn meeting_after(mut self, time: SystemTime) -> Self {
        self.meeting_after = Some(time);
        self
    }

    /// Every whitespace separated term must appear in the title, the content
    /// or the location name, ignoring case.
    pub fn search(mut self, text: &str) -> Self {
        self.search_terms.extend(text.split_whitespace().map(str::to_owned));
        self
    }

    pub fn order_by(mut self, ordering: Vec<Ordering>) -> Self {
        self.ordering = ordering;
        self
    }

    pub fn orderings(&self) -> &[Ordering] {
        if self.ordering.is_empty() {
            &DEFAULT_ORDERING[..]
        }
        else {
            &self.ordering[..]
        }
    }

    /// Filtered query without ordering, suitable for counting.
    pub fn to_boxed(&self) -> BoxedHelpRequests {
        let mut query = help_requests::table.into_boxed();

        if let Some(ref bbox) = self.location {
            query = query
                .filter(hr_dsl::location_lat.between(bbox.south, bbox.north))
                .filter(hr_dsl::location_lon.between(bbox.west, bbox.east));
        }

        if self.not_closed {
            query = query.filter(hr_dsl::is_closed.eq(false));
        }

        if let Some(after) = self.meeting_after {
            query = query.filter(hr_dsl::meeting_datetime.gt(after));
        }

        for term in &self.search_terms {
            let pattern = format!("%{}%", escape_like(term));
            query = query.filter(hr_dsl::title.ilike(pattern.clone())
                .or(hr_dsl::content.ilike(pattern.clone()))
                .or(hr_dsl::location_name.ilike(pattern)));
        }

        query
    }

    pub fn to_ordered(&self) -> BoxedHelpRequests {
        let mut query = self.to_boxed();

        for ordering in self.orderings() {
            query = match (ordering.field, ordering.descending) {
                (OrderField::MeetingDatetime, false) => query.then_order_by(hr_dsl::meeting_datetime.asc()),
                (OrderField::MeetingDatetime, true) => query.then_order_by(hr_dsl::meeting_datetime.desc()),
                (OrderField::Datetime, false) => query.then_order_by(hr_dsl::datetime.asc()),
                (OrderField::Datetime, true) => query.then_order_by(hr_dsl::datetime.desc()),
                (OrderField::Title, false) => query.then_order_by(hr_dsl::title.asc()),
                (OrderField::Title, true) => query.then_order_by(hr_dsl::title.desc()),
                (OrderField::LocationName, false) => query.then_order_by(hr_dsl::location_name.asc()),
                (OrderField::LocationName, true) => query.then_order_by(hr_dsl::location_name.desc()),
                (OrderField::Id, false) => query.then_order_by(hr_dsl::id.asc()),
                (OrderField::Id, true) => query.then_order_by(hr_dsl::id.desc()),
            };
        }

        // Stable pages.
        query.then_order_by(hr_dsl::id.asc())
    }
}


fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if c == '%' || c == '_' || c == '\\' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
