diesel::table! {
    articles (id) {
        id -> Int4,
        author_id -> Int4,
        title -> Varchar,
        content -> Text,
        published -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    followers (follower_id, follows_id) {
        follower_id -> Int4,
        follows_id -> Int4,
    }
}

diesel::table! {
    saves (user_id, article_id) {
        user_id -> Int4,
        article_id -> Int4,
    }
}

diesel::table! {
    users (id) {
        id -> Int4,
        login -> Varchar,
        full_name -> Varchar,
        password_hash -> Text,
    }
}

diesel::joinable!(articles -> users (author_id));
diesel::joinable!(saves -> articles (article_id));
diesel::joinable!(saves -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(articles, followers, saves, users);
