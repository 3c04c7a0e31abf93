use std::{
    collections::HashMap,
    iter,
    time::SystemTime,
};
use rocket::{
    State,
    request::{Form, LenientForm},
    response::{content::Json, status},
};
use serde_json::{json, Value as JsonValue};

use crate::auth::AuthUser;
use crate::config::Settings;
use crate::db::{
    self,
    models::{HelpRequest, HelpRequestChanges, HelpRequestReply, NewHelpRequest, User},
    query::{HelpRequestQuery, Ordering},
};
use crate::error::ApiError;
use crate::geo::{self, BoundingBox, Coordinate, InputError, Radius};
use crate::pagination::Page;
use crate::util;


pub type JsonResult = Result<Json<String>, ApiError>;
pub type CreatedResult = Result<status::Created<Json<String>>, ApiError>;

const MAX_TITLE_LEN: usize = 50;
const MAX_LOCATION_NAME_LEN: usize = 50;


pub fn make_json_result(value: JsonValue) -> JsonResult {
    Ok(Json(value.to_string()))
}


#[derive(FromForm, Default, Debug)]
pub struct ListParams {
    user_latitude: Option<String>,
    user_longitude: Option<String>,
    radius: Option<String>,
    not_closed: Option<String>,
    only_future_meetings: Option<String>,
    search: Option<String>,
    ordering: Option<String>,
    page: Option<String>,
    page_size: Option<String>,
}

impl ListParams {
    /// Builds the filter and the caller's reference point, if both
    /// coordinates were given. A lone coordinate or radius is ignored.
    fn to_query(&self, settings: &Settings)
        -> Result<(HelpRequestQuery, Option<Coordinate>), ApiError> {

        let mut query = HelpRequestQuery::all();
        let mut user_point = None;

        if let (Some(lat), Some(lon)) = (&self.user_latitude, &self.user_longitude) {
            let center = Coordinate::parse(lat, lon)?;
            let radius = match self.radius {
                Some(ref value) => Radius::parse(value)?,
                None => settings.default_radius,
            };

            query = query.location(BoundingBox::around(center, radius));
            user_point = Some(center);
        }

        if parse_optional_flag("not_closed", self.not_closed.as_deref())? {
            query = query.not_closed();
        }

        if parse_optional_flag("only_future_meetings", self.only_future_meetings.as_deref())? {
            query = query.only_future_meetings();
        }

        if let Some(ref text) = self.search {
            query = query.search(text);
        }

        if let Some(ref ordering) = self.ordering {
            query = query.order_by(Ordering::parse_list(ordering));
        }

        Ok((query, user_point))
    }
}

fn parse_optional_flag(field: &'static str, value: Option<&str>) -> Result<bool, InputError> {
    match value {
        Some(v) => geo::parse_flag(field, v),
        None => Ok(false),
    }
}


/// Validated field values shared by create and full update.
#[derive(Debug, PartialEq)]
struct HelpRequestFields {
    title: String,
    meeting_datetime: SystemTime,
    location_name: String,
    location_lat: Option<f64>,
    location_lon: Option<f64>,
    content: String,
    is_closed: bool,
}

impl HelpRequestFields {
    fn into_new(self, author_id: i32, now: SystemTime) -> NewHelpRequest {
        NewHelpRequest {
            title: self.title,
            author_id,
            datetime: now,
            meeting_datetime: self.meeting_datetime,
            location_name: self.location_name,
            location_lat: self.location_lat,
            location_lon: self.location_lon,
            content: self.content,
            is_closed: self.is_closed,
        }
    }

    fn into_changes(self) -> HelpRequestChanges {
        HelpRequestChanges {
            title: Some(self.title),
            meeting_datetime: Some(self.meeting_datetime),
            location_name: Some(self.location_name),
            location_lat: Some(self.location_lat),
            location_lon: Some(self.location_lon),
            content: Some(self.content),
            is_closed: Some(self.is_closed),
        }
    }
}


fn verify_title(title: &str) -> Option<&'static str> {
    if title.trim().is_empty() {
        Some("Title can not be empty")
    }
    else if title.chars().count() > MAX_TITLE_LEN {
        Some("Title can not be longer than 50 characters")
    }
    else {
        None
    }
}

fn verify_location_name(name: &str) -> Option<&'static str> {
    if name.trim().is_empty() {
        Some("Location name can not be empty")
    }
    else if name.chars().count() > MAX_LOCATION_NAME_LEN {
        Some("Location name can not be longer than 50 characters")
    }
    else {
        None
    }
}

fn verify_content(content: &str) -> Option<&'static str> {
    if content.trim().is_empty() {
        Some("Content can not be empty")
    }
    else {
        None
    }
}

fn parse_meeting_datetime(value: &str) -> Result<SystemTime, ApiError> {
    util::parse_time(value)
        .ok_or(ApiError::InvalidForm("Meeting datetime must be an RFC 3339 timestamp"))
}

/// A meeting point needs both coordinates or neither.
fn verify_location_pair(lat: Option<f64>, lon: Option<f64>) -> Result<(), ApiError> {
    if lat.is_some() == lon.is_some() {
        Ok(())
    }
    else {
        Err(ApiError::InvalidForm("Location latitude and longitude must be given together"))
    }
}

/// Empty input clears the location.
fn parse_location<F>(value: Option<&str>, parse: F) -> Result<Option<f64>, InputError>
    where F: Fn(&str) -> Result<f64, InputError> {

    match value.map(str::trim) {
        Some(v) if !v.is_empty() => parse(v).map(Some),
        _ => Ok(None),
    }
}


#[derive(FromForm)]
pub struct HelpRequestForm {
    title: String,
    meeting_datetime: String,
    location_name: String,
    location_lat: Option<String>,
    location_lon: Option<String>,
    content: String,
    is_closed: Option<String>,
}

impl HelpRequestForm {
    fn verify_error(&self) -> Option<&'static str> {
        verify_title(&self.title)
            .or_else(|| verify_location_name(&self.location_name))
            .or_else(|| verify_content(&self.content))
    }

    fn verify(self) -> Result<HelpRequestFields, ApiError> {
        if let Some(err) = self.verify_error() {
            return Err(ApiError::InvalidForm(err));
        }

        let location_lat = parse_location(self.location_lat.as_deref(), geo::parse_latitude)?;
        let location_lon = parse_location(self.location_lon.as_deref(), geo::parse_longitude)?;
        verify_location_pair(location_lat, location_lon)?;

        Ok(HelpRequestFields {
            meeting_datetime: parse_meeting_datetime(&self.meeting_datetime)?,
            location_lat,
            location_lon,
            is_closed: parse_optional_flag("is_closed", self.is_closed.as_deref())?,
            title: self.title,
            location_name: self.location_name,
            content: self.content,
        })
    }
}


#[derive(FromForm, Default)]
pub struct HelpRequestPatchForm {
    title: Option<String>,
    meeting_datetime: Option<String>,
    location_name: Option<String>,
    location_lat: Option<String>,
    location_lon: Option<String>,
    content: Option<String>,
    is_closed: Option<String>,
}

impl HelpRequestPatchForm {
    fn verify_error(&self) -> Option<&'static str> {
        self.title.as_ref().and_then(|v| verify_title(v))
            .or_else(|| self.location_name.as_ref().and_then(|v| verify_location_name(v)))
            .or_else(|| self.content.as_ref().and_then(|v| verify_content(v)))
    }

    fn verify(self) -> Result<HelpRequestChanges, ApiError> {
        if let Some(err) = self.verify_error() {
            return Err(ApiError::InvalidForm(err));
        }

        let meeting_datetime = match self.meeting_datetime {
            Some(ref value) => Some(parse_meeting_datetime(value)?),
            None => None,
        };
        let location_lat = match self.location_lat {
            Some(ref value) => Some(parse_location(Some(value.as_str()), geo::parse_latitude)?),
            None => None,
        };
        let location_lon = match self.location_lon {
            Some(ref value) => Some(parse_location(Some(value.as_str()), geo::parse_longitude)?),
            None => None,
        };
        let is_closed = match self.is_closed {
            Some(ref value) => Some(geo::parse_flag("is_closed", value)?),
            None => None,
        };

        Ok(HelpRequestChanges {
            title: self.title,
            meeting_datetime,
            location_name: self.location_name,
            location_lat,
            location_lon,
            content: self.content,
            is_closed,
        })
    }
}

/// Checks the location a patch leaves behind on `current`.
fn verify_patched_location(changes: &HelpRequestChanges, current: &HelpRequest) -> Result<(), ApiError> {
    verify_location_pair(
        changes.location_lat.unwrap_or(current.location_lat),
        changes.location_lon.unwrap_or(current.location_lon))
}


pub fn load_authors<I>(ids: I) -> Result<HashMap<i32, User>, ApiError>
    where I: Iterator<Item = i32> {

    let mut ids = ids.collect::<Vec<_>>();
    ids.sort();
    ids.dedup();

    Ok(db::get_users(&ids)?)
}

pub fn help_request_json(request: &HelpRequest, author: Option<&User>,
    user_point: Option<&Coordinate>) -> JsonValue {

    let mut value = json!({
        "id": request.id,
        "title": request.title,
        "author": request.author_id,
        "author_name": author.map(User::full_name).unwrap_or_default(),
        "datetime": util::format_time(request.datetime),
        "meeting_datetime": util::format_time(request.meeting_datetime),
        "location_name": request.location_name,
        "location_lat": request.location_lat,
        "location_lon": request.location_lon,
        "content": request.content,
        "is_closed": request.is_closed,
    });

    if let Some(point) = user_point {
        value["distance"] = json!(request.get_distance(point));
    }

    value
}

pub fn reply_json(reply: &HelpRequestReply, author: Option<&User>) -> JsonValue {
    json!({
        "id": reply.id,
        "help_request": reply.help_request_id,
        "author": reply.author_id,
        "author_name": author.map(User::full_name).unwrap_or_default(),
        "datetime": util::format_time(reply.datetime),
        "content": reply.content,
    })
}


#[get("/help-requests?<params..>")]
pub fn list_help_requests(_user: AuthUser, params: LenientForm<ListParams>,
    settings: State<Settings>) -> JsonResult {

    let settings = settings.inner();
    let (query, user_point) = params.to_query(settings)?;
    let page = Page::from_params(params.page.as_deref(), params.page_size.as_deref(), settings)?;

    let count = db::count_help_requests(&query)?;
    page.check(count)?;

    let requests = db::get_help_requests(&query, page.size, page.offset())?;
    let authors = load_authors(requests.iter().map(|r| r.author_id))?;

    let results = requests.iter()
        .map(|r| help_request_json(r, authors.get(&r.author_id), user_point.as_ref()))
        .collect::<Vec<_>>();

    make_json_result(page.envelope(count, results))
}

#[get("/help-requests/<id>")]
pub fn get_help_request(id: i32, _user: AuthUser) -> JsonResult {
    let request = db::get_help_request(id)?;
    let replies = db::get_replies(&request)?;
    let authors = load_authors(iter::once(request.author_id)
        .chain(replies.iter().map(|r| r.author_id)))?;

    let mut value = help_request_json(&request, authors.get(&request.author_id), None);
    value["replies"] = replies.iter()
        .map(|r| reply_json(r, authors.get(&r.author_id)))
        .collect::<Vec<_>>()
        .into();

    make_json_result(value)
}

#[post("/help-requests", format="application/x-www-form-urlencoded", data="<form>")]
pub fn post_help_request(user: AuthUser, form: Option<Form<HelpRequestForm>>) -> CreatedResult {
    let fields = form.ok_or(ApiError::InvalidForm("Invalid form"))?
        .into_inner()
        .verify()?;

    let request = db::insert_help_request(&fields.into_new(user.id(), SystemTime::now()))?;
    info!("Help request {} created by user {}", request.id, user.id());

    let body = help_request_json(&request, Some(&user.0), None).to_string();
    Ok(status::Created(format!("/help-requests/{}", request.id), Some(Json(body))))
}

#[put("/help-requests/<id>", format="application/x-www-form-urlencoded", data="<form>")]
pub fn put_help_request(id: i32, user: AuthUser, form: Option<Form<HelpRequestForm>>) -> JsonResult {
    let request = db::get_help_request(id)?;
    user.ensure_author(request.author_id)?;

    let changes = form.ok_or(ApiError::InvalidForm("Invalid form"))?
        .into_inner()
        .verify()?
        .into_changes();

    let updated = db::update_help_request(id, &changes)?;
    make_json_result(help_request_json(&updated, Some(&user.0), None))
}

#[patch("/help-requests/<id>", format="application/x-www-form-urlencoded", data="<form>")]
pub fn patch_help_request(id: i32, user: AuthUser, form: Option<Form<HelpRequestPatchForm>>)
    -> JsonResult {

    let request = db::get_help_request(id)?;
    user.ensure_author(request.author_id)?;

    let changes = form.ok_or(ApiError::InvalidForm("Invalid form"))?
        .into_inner()
        .verify()?;
    verify_patched_location(&changes, &request)?;

    let updated = if changes.is_empty() {
        request
    }
    else {
        db::update_help_request(id, &changes)?
    };

    make_json_result(help_request_json(&updated, Some(&user.0), None))
}

#[delete("/help-requests/<id>")]
pub fn delete_help_request(id: i32, user: AuthUser) -> Result<status::NoContent, ApiError> {
    let request = db::get_help_request(id)?;
    user.ensure_author(request.author_id)?;

    match db::delete_help_request(id)? {
        0 => Err(ApiError::NotFound),
        _ => {
            info!("Help request {} deleted by user {}", id, user.id());
            Ok(status::NoContent)
        },
    }
}


#[cfg(test)]
mod tests {
    use std::time::{Duration, UNIX_EPOCH};
    use diesel::{debug_query, pg::Pg};
    use super::*;

    fn form() -> HelpRequestForm {
        HelpRequestForm {
            title: "Groceries for grandma".into(),
            meeting_datetime: "2026-11-01T10:00:00Z".into(),
            location_name: "Corner store".into(),
            location_lat: Some("40.05".into()),
            location_lon: Some("-74.0".into()),
            content: "She can not carry the bags".into(),
            is_closed: None,
        }
    }

    fn params(lat: Option<&str>, lon: Option<&str>, radius: Option<&str>) -> ListParams {
        ListParams {
            user_latitude: lat.map(Into::into),
            user_longitude: lon.map(Into::into),
            radius: radius.map(Into::into),
            ..Default::default()
        }
    }

    fn record(lat: f64, lon: f64) -> HelpRequest {
        HelpRequest {
            id: 9,
            title: "t".into(),
            author_id: 1,
            datetime: UNIX_EPOCH,
            meeting_datetime: SystemTime::now() + Duration::from_secs(60),
            location_name: "l".into(),
            location_lat: Some(lat),
            location_lon: Some(lon),
            content: "c".into(),
            is_closed: false,
        }
    }

    fn sql(query: &HelpRequestQuery) -> String {
        debug_query::<Pg, _>(&query.to_boxed()).to_string()
    }

    fn box_sql(lat: f64, lon: f64, miles: f64) -> String {
        let bbox = BoundingBox::around(
            Coordinate { latitude: lat, longitude: lon },
            Radius::new(miles).unwrap());
        sql(&HelpRequestQuery::all().location(bbox))
    }

    #[test]
    fn geo_params_filter_by_box() {
        let settings = Settings::default();
        let (query, point) = params(Some("40.0"), Some("-74.0"), Some("2.5"))
            .to_query(&settings).unwrap();

        assert_eq!(point, Some(Coordinate { latitude: 40.0, longitude: -74.0 }));
        assert_eq!(sql(&query), box_sql(40.0, -74.0, 2.5));
        assert_ne!(sql(&query), box_sql(-74.0, 40.0, 2.5));
    }

    #[test]
    fn omitted_radius_matches_explicit_default() {
        let settings = Settings::default();
        let (implicit, _) = params(Some("40"), Some("-74"), None).to_query(&settings).unwrap();
        let (explicit, _) = params(Some("40"), Some("-74"), Some("5")).to_query(&settings).unwrap();

        assert_eq!(sql(&implicit), sql(&explicit));
        assert_eq!(sql(&implicit), box_sql(40.0, -74.0, 5.0));
        assert_ne!(sql(&implicit), box_sql(40.0, -74.0, 10.0));
    }

    #[test]
    fn configured_default_radius_is_used() {
        let settings = Settings { default_radius: Radius::new(12.0).unwrap(), ..Settings::default() };
        let (query, _) = params(Some("40"), Some("-74"), None).to_query(&settings).unwrap();

        assert_eq!(sql(&query), box_sql(40.0, -74.0, 12.0));
    }

    #[test]
    fn geo_filter_needs_both_coordinates() {
        let settings = Settings::default();
        let (query, point) = params(Some("40"), None, Some("-1")).to_query(&settings).unwrap();

        assert_eq!(point, None);
        assert!(!sql(&query).contains("WHERE"));
    }

    #[test]
    fn invalid_geo_params_are_rejected() {
        let settings = Settings::default();

        for &(lat, lon, radius) in &[
            ("forty", "-74", None),
            ("40", "", None),
            ("95", "-74", None),
            ("40", "-74", Some("0")),
            ("40", "-74", Some("-2")),
            ("40", "-74", Some("wide")),
        ] {
            let err = params(Some(lat), Some(lon), radius).to_query(&settings).unwrap_err();
            assert_eq!(err.status(), rocket::http::Status::BadRequest, "{} {} {:?}", lat, lon, radius);
        }
    }

    #[test]
    fn status_flags() {
        let settings = Settings::default();
        let list = ListParams {
            not_closed: Some("true".into()),
            only_future_meetings: Some("1".into()),
            ..Default::default()
        };
        let rendered = sql(&list.to_query(&settings).unwrap().0);
        assert!(rendered.contains("\"is_closed\" = $1"), "{}", rendered);
        assert!(rendered.contains("\"meeting_datetime\" > $2"), "{}", rendered);

        let off = ListParams {
            not_closed: Some("false".into()),
            only_future_meetings: Some("0".into()),
            ..Default::default()
        };
        assert!(!sql(&off.to_query(&settings).unwrap().0).contains("WHERE"));

        let bad = ListParams { not_closed: Some("perhaps".into()), ..Default::default() };
        assert!(bad.to_query(&settings).is_err());
    }

    #[test]
    fn valid_form() {
        let fields = form().verify().unwrap();

        assert_eq!(fields.location_lat, Some(40.05));
        assert_eq!(fields.location_lon, Some(-74.0));
        assert!(!fields.is_closed);
        assert_eq!(util::format_time(fields.meeting_datetime), "2026-11-01T10:00:00Z");

        let new = fields.into_new(3, UNIX_EPOCH);
        assert_eq!(new.author_id, 3);
        assert_eq!(new.datetime, UNIX_EPOCH);
    }

    #[test]
    fn form_errors() {
        let mut f = form();
        f.title = "x".repeat(51);
        assert_eq!(f.verify_error(), Some("Title can not be longer than 50 characters"));

        let mut f = form();
        f.location_name = "  ".into();
        assert_eq!(f.verify_error(), Some("Location name can not be empty"));

        let mut f = form();
        f.meeting_datetime = "tomorrow".into();
        assert!(f.verify().is_err());

        let mut f = form();
        f.location_lat = Some("100".into());
        assert!(f.verify().is_err());

        let mut f = form();
        f.location_lat = Some("".into());
        f.location_lon = None;
        let fields = f.verify().unwrap();
        assert_eq!(fields.location_lat, None);
        assert_eq!(fields.location_lon, None);
    }

    #[test]
    fn location_needs_both_coordinates() {
        let mut f = form();
        f.location_lon = None;
        match f.verify() {
            Err(ApiError::InvalidForm(msg)) => assert!(msg.contains("together")),
            other => panic!("unexpected {:?}", other.map(|_| ())),
        }

        let mut f = form();
        f.location_lat = Some(" ".into());
        assert!(f.verify().is_err());

        let mut f = form();
        f.location_lat = None;
        f.location_lon = None;
        assert!(f.verify().is_ok());
    }

    #[test]
    fn patch_location_checked_against_stored_record() {
        let located = record(40.0, -74.0);
        let mut unlocated = record(0.0, 0.0);
        unlocated.location_lat = None;
        unlocated.location_lon = None;

        let lat_only = HelpRequestPatchForm { location_lat: Some("41".into()), ..Default::default() }
            .verify().unwrap();
        assert!(verify_patched_location(&lat_only, &located).is_ok());
        assert!(verify_patched_location(&lat_only, &unlocated).is_err());

        let clear_lat = HelpRequestPatchForm { location_lat: Some("".into()), ..Default::default() }
            .verify().unwrap();
        assert!(verify_patched_location(&clear_lat, &located).is_err());

        let clear_both = HelpRequestPatchForm {
            location_lat: Some("".into()),
            location_lon: Some("".into()),
            ..Default::default()
        }.verify().unwrap();
        assert!(verify_patched_location(&clear_both, &located).is_ok());

        let untouched = HelpRequestPatchForm { title: Some("New".into()), ..Default::default() }
            .verify().unwrap();
        assert!(verify_patched_location(&untouched, &unlocated).is_ok());
    }

    #[test]
    fn full_update_sets_every_column() {
        let changes = form().verify().unwrap().into_changes();

        assert_eq!(changes.title.as_deref(), Some("Groceries for grandma"));
        assert_eq!(changes.location_lat, Some(Some(40.05)));
        assert_eq!(changes.is_closed, Some(false));
    }

    #[test]
    fn patch_form() {
        assert!(HelpRequestPatchForm::default().verify().unwrap().is_empty());

        let patch = HelpRequestPatchForm {
            is_closed: Some("yes".into()),
            location_lat: Some("".into()),
            ..Default::default()
        };
        let changes = patch.verify().unwrap();
        assert_eq!(changes.is_closed, Some(true));
        assert_eq!(changes.location_lat, Some(None));
        assert_eq!(changes.location_lon, None);
        assert_eq!(changes.title, None);

        let patch = HelpRequestPatchForm { content: Some("".into()), ..Default::default() };
        assert!(patch.verify().is_err());
    }

    #[test]
    fn json_rendering() {
        let user = User {
            id: 1,
            username: "jdoe".into(),
            first_name: "Jane".into(),
            last_name: "Doe".into(),
        };
        let r = record(43.0, -70.0);

        let value = help_request_json(&r, Some(&user), None);
        assert_eq!(value["author_name"], "Jane Doe");
        assert_eq!(value["datetime"], "1970-01-01T00:00:00Z");
        assert_eq!(value["location_lat"], 43.0);
        assert!(value.get("distance").is_none());

        let point = Coordinate { latitude: 40.0, longitude: -74.0 };
        let value = help_request_json(&r, None, Some(&point));
        assert_eq!(value["author_name"], "");
        assert!((value["distance"].as_f64().unwrap() - 5.0).abs() < 1e-9);
    }
}
