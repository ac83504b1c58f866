diesel::table! {
    accounts (id) {
        id -> Integer,
        full_name -> Text,
        email -> Text,
        phone -> Text,
        password_hash -> Text,
    }
}
