use ecowatt::auth::{Repository, Role, UserStore, hash_password};
use tempfile::tempdir;

fn main() {
    println!("=== Auth Test Suite ===\n");

    let dir = tempdir().expect("Failed to create temp dir");
    let store = UserStore::new(dir.path());
    store.init().expect("Failed to initialize store");

    println!("Test 1: Seed accounts exist after init");
    let users = store.list(Role::User).expect("Failed to list users");
    let admins = store.list(Role::Admin).expect("Failed to list admins");
    assert_eq!(users.len(), 2);
    assert_eq!(admins.len(), 1);
    assert!(users.iter().any(|u| u.username == "user1"));
    assert!(admins.iter().any(|a| a.username == "admin"));
    println!("Seeded {} users and {} admins - PASS\n", users.len(), admins.len());

    println!("Test 2: Passwords are stored as digests");
    assert_eq!(users[0].password, hash_password("password123"));
    assert_ne!(users[0].password, "password123");
    println!("Stored digest differs from plaintext - PASS\n");

    println!("Test 3: Authenticate with correct credentials");
    let record = store
        .authenticate("user1", "password123", Role::User)
        .expect("Authentication errored")
        .expect("Expected a match");
    assert_eq!(record.username, "user1");
    assert_eq!(record.role, Role::User);
    println!("user1 authenticated - PASS\n");

    println!("Test 4: Wrong password is rejected");
    let miss = store
        .authenticate("user1", "wrongpass", Role::User)
        .expect("Authentication errored");
    assert!(miss.is_none());
    println!("Wrong password rejected - PASS\n");

    println!("Test 5: Role collections are isolated");
    let cross = store
        .authenticate("user1", "password123", Role::Admin)
        .expect("Authentication errored");
    assert!(cross.is_none());
    println!("User credentials rejected against admin collection - PASS\n");

    println!("Test 6: Register a new user");
    store
        .register("carol", "secret99", "carol@example.com", "Carol Jones", Role::User)
        .expect("Registration failed");
    let found = store
        .authenticate("carol", "secret99", Role::User)
        .expect("Authentication errored");
    assert!(found.is_some());
    println!("carol registered and can log in - PASS\n");

    println!("Test 7: Duplicate username is rejected without changes");
    let before = store.list(Role::User).expect("Failed to list users");
    let err = store
        .register("carol", "other", "other@example.com", "Other", Role::User)
        .expect_err("Expected duplicate username error");
    assert_eq!(err, "Username already exists");
    let after = store.list(Role::User).expect("Failed to list users");
    assert_eq!(before.len(), after.len());
    println!("Duplicate username rejected, store unchanged - PASS\n");

    println!("Test 8: Duplicate email is rejected with its own message");
    let err = store
        .register("carol2", "other", "carol@example.com", "Other", Role::User)
        .expect_err("Expected duplicate email error");
    assert_eq!(err, "Email already exists");
    println!("Duplicate email rejected - PASS\n");

    println!("Test 9: Same username may exist in both collections");
    store
        .register("carol", "adminpass", "carol-admin@example.com", "Carol Admin", Role::Admin)
        .expect("Admin registration failed");
    assert!(
        store
            .authenticate("carol", "adminpass", Role::Admin)
            .expect("Authentication errored")
            .is_some()
    );
    println!("carol exists independently as user and admin - PASS\n");

    println!("Test 10: Delete then re-register");
    store.delete("carol", Role::User).expect("Delete failed");
    assert!(
        store
            .authenticate("carol", "secret99", Role::User)
            .expect("Authentication errored")
            .is_none()
    );
    store
        .register("carol", "secret99", "carol@example.com", "Carol Jones", Role::User)
        .expect("Re-registration after delete failed");
    println!("Deleted account freed its username and email - PASS\n");

    println!("Test 11: Deleting an unknown username is a no-op");
    let before = store.list(Role::User).expect("Failed to list users");
    store.delete("nobody", Role::User).expect("Delete errored");
    let after = store.list(Role::User).expect("Failed to list users");
    assert_eq!(before.len(), after.len());
    println!("Unknown delete left the store unchanged - PASS\n");

    println!("Test 12: Empty registration fields are rejected");
    let err = store
        .register("", "pass", "x@example.com", "X", Role::User)
        .expect_err("Expected empty field error");
    assert_eq!(err, "Username, email, full name and password cannot be empty");
    println!("Empty username rejected - PASS\n");

    println!("=== All auth tests passed ===");
}
