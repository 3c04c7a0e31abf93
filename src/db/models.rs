use std::time::SystemTime;
use super::schema::{help_requests, help_request_replies};
use crate::geo::Coordinate;


#[derive(Queryable, Debug, Clone)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_owned()
    }
}


#[derive(Queryable, Identifiable, Debug, Clone, PartialEq)]
#[table_name="help_requests"]
pub struct HelpRequest {
    pub id: i32,
    pub title: String,
    pub author_id: i32,
    pub datetime: SystemTime,
    pub meeting_datetime: SystemTime,
    pub location_name: String,
    pub location_lat: Option<f64>,
    pub location_lon: Option<f64>,
    pub content: String,
    pub is_closed: bool,
}

impl HelpRequest {
    pub fn location(&self) -> Option<Coordinate> {
        match (self.location_lat, self.location_lon) {
            (Some(latitude), Some(longitude)) => Some(Coordinate { latitude, longitude }),
            _ => None,
        }
    }

    /// Planar distance in degrees from `user` to the meeting location.
    pub fn get_distance(&self, user: &Coordinate) -> Option<f64> {
        self.location().map(|location| user.planar_distance(&location))
    }
}

#[derive(Insertable)]
#[table_name="help_requests"]
pub struct NewHelpRequest {
    pub title: String,
    pub author_id: i32,
    pub datetime: SystemTime,
    pub meeting_datetime: SystemTime,
    pub location_name: String,
    pub location_lat: Option<f64>,
    pub location_lon: Option<f64>,
    pub content: String,
    pub is_closed: bool,
}

/// `None` leaves a column untouched. For the location columns,
/// `Some(None)` clears the stored value.
#[derive(AsChangeset, Default, Debug, PartialEq)]
#[table_name="help_requests"]
pub struct HelpRequestChanges {
    pub title: Option<String>,
    pub meeting_datetime: Option<SystemTime>,
    pub location_name: Option<String>,
    pub location_lat: Option<Option<f64>>,
    pub location_lon: Option<Option<f64>>,
    pub content: Option<String>,
    pub is_closed: Option<bool>,
}

impl HelpRequestChanges {
    pub fn is_empty(&self) -> bool {
        *self == HelpRequestChanges::default()
    }
}


#[derive(Queryable, Identifiable, Associations, Debug, Clone)]
#[belongs_to(HelpRequest)]
#[table_name="help_request_replies"]
pub struct HelpRequestReply {
    pub id: i32,
    pub help_request_id: i32,
    pub author_id: i32,
    pub datetime: SystemTime,
    pub content: String,
}

#[derive(Insertable)]
#[table_name="help_request_replies"]
pub struct NewHelpRequestReply {
    pub help_request_id: i32,
    pub author_id: i32,
    pub datetime: SystemTime,
    pub content: String,
}
