pub mod models;
pub mod query;
pub mod schema;


use std::collections::HashMap;
use std::env;
use std::time::SystemTime;

use diesel::prelude::*;
use diesel::pg::PgConnection;
use diesel::result::QueryResult;

use models::*;
use query::HelpRequestQuery;
use schema::access_tokens::dsl::{self as t_dsl};
use schema::help_request_replies::dsl::{self as rp_dsl};
use schema::help_requests::dsl::{self as hr_dsl};
use schema::users::dsl::{self as u_dsl};


thread_local! {
    static DB_CONN: PgConnection = establish_connection();
}


fn establish_connection() -> PgConnection {
    let database_url = env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set");
    PgConnection::establish(&database_url)
        .unwrap_or_else(|err| panic!("Error connecting to {}: {}", database_url, err))
}

pub fn find_user_by_token(token: &str, now: SystemTime) -> QueryResult<User> {
    DB_CONN.with(|conn| {
        t_dsl::access_tokens
            .inner_join(u_dsl::users)
            .filter(t_dsl::token.eq(token))
            .filter(t_dsl::expires.gt(now))
            .select(schema::users::all_columns)
            .first::<User>(conn)
    })
}

pub fn get_users(ids: &[i32]) -> QueryResult<HashMap<i32, User>> {
    DB_CONN.with(|conn| {
        u_dsl::users
            .filter(u_dsl::id.eq_any(ids))
            .load::<User>(conn)
    }).map(|users| users.into_iter().map(|u| (u.id, u)).collect())
}

pub fn count_help_requests(query: &HelpRequestQuery) -> QueryResult<i64> {
    DB_CONN.with(|conn| {
        query.to_boxed()
            .count()
            .get_result(conn)
    })
}

pub fn get_help_requests(query: &HelpRequestQuery, limit: i64, offset: i64)
    -> QueryResult<Vec<HelpRequest>> {

    DB_CONN.with(|conn| {
        query.to_ordered()
            .limit(limit)
            .offset(offset)
            .load::<HelpRequest>(conn)
    })
}

pub fn get_help_request(id: i32) -> QueryResult<HelpRequest> {
    DB_CONN.with(|conn| {
        hr_dsl::help_requests
            .find(id)
            .first(conn)
    })
}

pub fn insert_help_request(request: &NewHelpRequest) -> QueryResult<HelpRequest> {
    DB_CONN.with(|conn| {
        diesel::insert_into(schema::help_requests::table)
            .values(request)
            .get_result::<HelpRequest>(conn)
    })
}

pub fn update_help_request(id: i32, changes: &HelpRequestChanges) -> QueryResult<HelpRequest> {
    DB_CONN.with(|conn| {
        diesel::update(hr_dsl::help_requests.find(id))
            .set(changes)
            .get_result::<HelpRequest>(conn)
    })
}

/// Replies go with the request through `ON DELETE CASCADE`.
pub fn delete_help_request(id: i32) -> QueryResult<usize> {
    DB_CONN.with(|conn| {
        diesel::delete(hr_dsl::help_requests.find(id))
            .execute(conn)
    })
}

pub fn get_replies(request: &HelpRequest) -> QueryResult<Vec<HelpRequestReply>> {
    DB_CONN.with(|conn| {
        HelpRequestReply::belonging_to(request)
            .order((rp_dsl::datetime.asc(), rp_dsl::id.asc()))
            .load::<HelpRequestReply>(conn)
    })
}

pub fn get_reply(help_request_id: i32, id: i32) -> QueryResult<HelpRequestReply> {
    DB_CONN.with(|conn| {
        rp_dsl::help_request_replies
            .filter(rp_dsl::help_request_id.eq(help_request_id))
            .filter(rp_dsl::id.eq(id))
            .first(conn)
    })
}

pub fn insert_reply(reply: &NewHelpRequestReply) -> QueryResult<HelpRequestReply> {
    DB_CONN.with(|conn| {
        diesel::insert_into(schema::help_request_replies::table)
            .values(reply)
            .get_result::<HelpRequestReply>(conn)
    })
}

pub fn delete_reply(id: i32) -> QueryResult<usize> {
    DB_CONN.with(|conn| {
        diesel::delete(rp_dsl::help_request_replies.find(id))
            .execute(conn)
    })
}
