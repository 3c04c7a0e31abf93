use std::time::SystemTime;
use rocket::{
    request::Form,
    response::{content::Json, status},
};
use serde_json::json;

use crate::auth::AuthUser;
use crate::db::{self, models::NewHelpRequestReply};
use crate::error::ApiError;
use crate::help_request_route::{load_authors, make_json_result, reply_json, CreatedResult, JsonResult};


#[derive(FromForm)]
pub struct ReplyForm {
    content: String,
}

impl ReplyForm {
    fn verify_error(&self) -> Option<&'static str> {
        if self.content.trim().is_empty() {
            Some("Content can not be empty")
        }
        else {
            None
        }
    }
}


#[get("/help-requests/<id>/replies")]
pub fn get_replies(id: i32, _user: AuthUser) -> JsonResult {
    let request = db::get_help_request(id)?;
    let replies = db::get_replies(&request)?;
    let authors = load_authors(replies.iter().map(|r| r.author_id))?;

    let results = replies.iter()
        .map(|r| reply_json(r, authors.get(&r.author_id)))
        .collect::<Vec<_>>();

    make_json_result(json!({
        "count": results.len(),
        "results": results,
    }))
}

#[post("/help-requests/<id>/replies", format="application/x-www-form-urlencoded", data="<form>")]
pub fn post_reply(id: i32, user: AuthUser, form: Option<Form<ReplyForm>>) -> CreatedResult {
    let form = form.ok_or(ApiError::InvalidForm("Invalid form"))?.into_inner();
    if let Some(err) = form.verify_error() {
        return Err(ApiError::InvalidForm(err));
    }

    let request = db::get_help_request(id)?;
    let reply = db::insert_reply(&NewHelpRequestReply {
        help_request_id: request.id,
        author_id: user.id(),
        datetime: SystemTime::now(),
        content: form.content,
    })?;
    info!("Reply {} to help request {} created by user {}", reply.id, request.id, user.id());

    let body = reply_json(&reply, Some(&user.0)).to_string();
    Ok(status::Created(format!("/help-requests/{}/replies/{}", request.id, reply.id), Some(Json(body))))
}

#[delete("/help-requests/<id>/replies/<reply_id>")]
pub fn delete_reply(id: i32, reply_id: i32, user: AuthUser) -> Result<status::NoContent, ApiError> {
    let reply = db::get_reply(id, reply_id)?;
    user.ensure_author(reply.author_id)?;

    match db::delete_reply(reply.id)? {
        0 => Err(ApiError::NotFound),
        _ => Ok(status::NoContent),
    }
}
