// Diesel table definitions, kept in sync with `schema.rs`.

diesel::table! {
    institutions (id) {
        id -> Integer,
        name -> Text,
        #[sql_name = "type"]
        institution_type -> Text,
        location -> Nullable<Text>,
        established_year -> Nullable<Integer>,
        total_students -> Nullable<Integer>,
        total_faculty -> Nullable<Integer>,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    users (id) {
        id -> Integer,
        email -> Text,
        name -> Text,
        role -> Text,
        institution_id -> Integer,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    subjects (id) {
        id -> Integer,
        name -> Text,
        code -> Text,
        institution_id -> Integer,
        created_at -> Text,
    }
}

diesel::table! {
    question_papers (id) {
        id -> Integer,
        title -> Text,
        subject_id -> Integer,
        institution_id -> Integer,
        uploaded_by -> Integer,
        exam_year -> Integer,
        exam_type -> Text,
        difficulty_level -> Nullable<Text>,
        file_url -> Text,
        file_size -> BigInt,
        download_count -> Integer,
        is_public -> Bool,
        tags_json -> Nullable<Text>,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    metrics (id) {
        id -> Integer,
        institution_id -> Integer,
        metric_type -> Text,
        value -> BigInt,
        date -> Text,
        created_at -> Text,
    }
}

diesel::table! {
    testimonials (id) {
        id -> Integer,
        user_id -> Integer,
        institution_id -> Integer,
        content -> Text,
        rating -> Integer,
        is_featured -> Bool,
        video_url -> Nullable<Text>,
        created_at -> Text,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    institutions,
    users,
    subjects,
    question_papers,
    metrics,
    testimonials,
);
