diesel::table! {
    users (id) {
        id -> Integer,
        username -> Text,
        password -> Text,
        email -> Nullable<Text>,
        is_admin -> Bool,
    }
}

diesel::table! {
    categories (id) {
        id -> Text,
        name -> Text,
        parent_category_id -> Nullable<Text>,
        primary_contact -> Text,
        user_name -> Text,
        primary_email -> Text,
        phone -> Nullable<Text>,
        deleted -> Bool,
    }
}

diesel::table! {
    locations (id) {
        id -> Text,
        name -> Text,
        address1 -> Nullable<Text>,
        address2 -> Nullable<Text>,
        city -> Nullable<Text>,
        state -> Text,
        zip -> Nullable<Text>,
        primary_contact -> Text,
        primary_email -> Text,
        phone -> Text,
        send_email -> Bool,
    }
}

diesel::table! {
    tickets (id) {
        id -> Text,
        kind -> Text,
        username -> Text,
        first_name -> Text,
        last_name -> Nullable<Text>,
        email -> Text,
        phone -> Nullable<Text>,
        category_id -> Text,
        location_id -> Nullable<Text>,
        description -> Text,
        severity -> Integer,
        status -> Integer,
        assigned_to -> Nullable<Text>,
        notes -> Nullable<Text>,
        resolution -> Nullable<Text>,
        pc_name -> Nullable<Text>,
        target_ministry -> Nullable<Text>,
        existing_footage -> Bool,
        story_boards -> Bool,
        deadline -> Nullable<Timestamp>,
        date_submitted -> Timestamp,
        last_updated -> Timestamp,
        version -> Integer,
    }
}

diesel::table! {
    updates (id) {
        id -> Text,
        ticket_id -> Text,
        username -> Text,
        notes -> Text,
        is_resolved -> Bool,
        status -> Nullable<Integer>,
        date_created -> Timestamp,
    }
}

diesel::table! {
    system_parameters (id) {
        id -> Integer,
        name -> Text,
        description -> Text,
        value -> Text,
        required -> Bool,
        can_be_edited -> Bool,
        is_password -> Bool,
        date_created -> Timestamp,
        last_updated -> Timestamp,
        updated_by -> Text,
    }
}

diesel::joinable!(tickets -> categories (category_id));
diesel::joinable!(tickets -> locations (location_id));
diesel::joinable!(updates -> tickets (ticket_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    categories,
    locations,
    tickets,
    updates,
    system_parameters,
);
