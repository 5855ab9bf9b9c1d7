// Kept in sync by hand with `db::SCHEMA_SQL`.

diesel::table! {
    taxonomy_assignments (id) {
        id -> Integer,
        node_id -> Integer,
        entity_type -> Text,
        entity_id -> Text,
        created_at -> Timestamp,
    }
}

diesel::table! {
    taxonomy_nodes (id) {
        id -> Integer,
        kind -> Text,
        name -> Text,
        slug -> Text,
        parent_id -> Nullable<Integer>,
        path -> Text,
        level -> Integer,
        sort_order -> Integer,
        is_active -> Bool,
        color -> Nullable<Text>,
        icon -> Nullable<Text>,
        description -> Nullable<Text>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::joinable!(taxonomy_assignments -> taxonomy_nodes (node_id));

diesel::allow_tables_to_appear_in_same_query!(taxonomy_assignments, taxonomy_nodes,);
