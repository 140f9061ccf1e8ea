diesel::table! {
    users (user_id) {
        user_id -> Uuid,
        email -> Text,
        password_hash -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    profiles (user_id) {
        user_id -> Uuid,
        name -> Nullable<Text>,
        company_name -> Nullable<Text>,
        mobile_number -> Nullable<Text>,
        cal_username -> Nullable<Text>,
        cal_api_key -> Nullable<Text>,
        cal_event_type_id -> Nullable<Text>,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    subscriptions (id) {
        id -> Uuid,
        user_id -> Uuid,
        plan_id -> Text,
        status -> Text,
        stripe_subscription_id -> Text,
        stripe_customer_id -> Text,
        current_period_start -> Nullable<Timestamptz>,
        current_period_end -> Nullable<Timestamptz>,
        cancel_at_period_end -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    transcriptions (id) {
        id -> Uuid,
        user_id -> Uuid,
        customer_name -> Text,
        caller_number -> Nullable<Text>,
        turns -> Jsonb,
        summary -> Nullable<Text>,
        duration_seconds -> Nullable<Int4>,
        received_at -> Timestamptz,
    }
}

diesel::table! {
    agenda_events (id) {
        id -> Uuid,
        user_id -> Uuid,
        title -> Text,
        description -> Nullable<Text>,
        location -> Nullable<Text>,
        start_time -> Timestamptz,
        end_time -> Timestamptz,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
        deleted_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    notifications (id) {
        id -> Uuid,
        user_id -> Uuid,
        title -> Text,
        message -> Text,
        kind -> Text,
        read -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(profiles -> users (user_id));
diesel::joinable!(subscriptions -> users (user_id));
diesel::joinable!(transcriptions -> users (user_id));
diesel::joinable!(agenda_events -> users (user_id));
diesel::joinable!(notifications -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    profiles,
    subscriptions,
    transcriptions,
    agenda_events,
    notifications,
);
