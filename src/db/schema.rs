table! {
    users (id) {
        id -> Integer,
        username -> Text,
        first_name -> Text,
        last_name -> Text,
    }
}

table! {
    access_tokens (id) {
        id -> Integer,
        token -> Text,
        user_id -> Integer,
        expires -> Timestamp,
    }
}

table! {
    help_requests (id) {
        id -> Integer,
        title -> Text,
        author_id -> Integer,
        datetime -> Timestamp,
        meeting_datetime -> Timestamp,
        location_name -> Text,
        location_lat -> Nullable<Double>,
        location_lon -> Nullable<Double>,
        content -> Text,
        is_closed -> Bool,
    }
}

table! {
    help_request_replies (id) {
        id -> Integer,
        help_request_id -> Integer,
        author_id -> Integer,
        datetime -> Timestamp,
        content -> Text,
    }
}

joinable!(access_tokens -> users (user_id));
joinable!(help_requests -> users (author_id));
joinable!(help_request_replies -> help_requests (help_request_id));

allow_tables_to_appear_in_same_query!(
    users,
    access_tokens,
    help_requests,
    help_request_replies,
);
