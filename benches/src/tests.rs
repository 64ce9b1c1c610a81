use crate::context::{Context, User};

fn user(name: &str, age: u32, is_disabled: bool) -> User {
    User {
        name: name.to_owned(),
        age,
        is_disabled,
    }
}

#[test]
fn page_renders() {
    let ctx = Context {
        title: String::from("Users"),
        users: vec![user("alice", 30, false), user("bob", 41, true)],
    };
    let group = crate::group();
    let st = crate::instance(&group, &ctx);
    assert_eq!(
        st.render().to_string(),
        "Users\n  alice (30)\n  bob (41) disabled"
    );
}

#[test]
fn random_is_seeded() {
    let a = crate::context::random(3, 7);
    let b = crate::context::random(3, 7);
    assert_eq!(a.title, b.title);
    assert_eq!(a.users.len(), 3);
    assert!(a.users.iter().zip(&b.users).all(|(a, b)| a.name == b.name));
}
