use chrono::Local;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{File, create_dir_all};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Account role, selecting which credential collection a record lives in
///
/// Regular users and administrators are kept in two disjoint collections
/// with independent username/email uniqueness domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular dashboard user
    User,

    /// Administrator with access to the admin panel
    Admin,
}

impl Role {
    /// Lowercase name used in forms, templates and stored records
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    /// Parse a role from its form value
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    /// File name of the collection backing this role
    fn file_name(&self) -> &'static str {
        match self {
            Role::User => "users.json",
            Role::Admin => "admin_users.json",
        }
    }
}

/// A registered account
///
/// Records are created at registration, never edited, and removed only by
/// an admin delete action.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UserRecord {
    /// Username (unique key within the role collection)
    pub username: String,

    /// SHA-256 hex digest of the password (unsalted)
    pub password: String,

    /// Email address (unique within the role collection)
    pub email: String,

    /// Display name shown on the dashboards
    pub full_name: String,

    /// Role the record was registered under
    pub role: Role,

    /// Registration timestamp, `YYYY-MM-DD HH:MM:SS`
    pub created_at: String,
}

/// Storage interface for credential records
///
/// The store's domain operations go through this interface, so swapping
/// the flat files for an embedded store touches one implementation.
pub trait Repository {
    /// Look up a record by username within one role collection
    fn get(&self, username: &str, role: Role) -> Result<Option<UserRecord>, String>;

    /// Insert a record, replacing any existing record with the same username
    fn put(&self, record: UserRecord) -> Result<(), String>;

    /// Remove a record by username; removing an absent username is a no-op
    fn delete(&self, username: &str, role: Role) -> Result<(), String>;

    /// All records in one role collection
    fn list(&self, role: Role) -> Result<Vec<UserRecord>, String>;
}

/// Flat-file credential store
///
/// Two JSON arrays under a base directory back the two role collections.
/// Access is read-modify-write with no locking; the application targets a
/// single concurrent operator.
#[derive(Debug, Clone)]
pub struct UserStore {
    dir: PathBuf,
}

/// Hash a password with SHA-256, returning the lowercase hex digest
///
/// No per-user salt is applied; stored digests are directly comparable.
pub fn hash_password(password: &str) -> String {
    let digest = Sha256::digest(password.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

impl UserStore {
    /// Open a store rooted at the given directory
    pub fn new(dir: impl AsRef<Path>) -> Self {
        UserStore {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Initialize the store directory and seed the credential files
    ///
    /// Creates the base directory and, for each collection that does not
    /// exist yet, writes it with the sample rows the demo ships with.
    ///
    /// # Returns
    /// * `std::io::Result<()>` - Success or an IO error
    pub fn init(&self) -> std::io::Result<()> {
        if !self.dir.exists() {
            create_dir_all(&self.dir)?;
        }

        let now = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

        if !self.path_for(Role::User).exists() {
            let seed = vec![
                UserRecord {
                    username: "user1".to_string(),
                    password: hash_password("password123"),
                    email: "user1@example.com".to_string(),
                    full_name: "John Doe".to_string(),
                    role: Role::User,
                    created_at: now.clone(),
                },
                UserRecord {
                    username: "user2".to_string(),
                    password: hash_password("password123"),
                    email: "user2@example.com".to_string(),
                    full_name: "Jane Smith".to_string(),
                    role: Role::User,
                    created_at: now.clone(),
                },
            ];
            self.write_collection(Role::User, &seed)
                .map_err(std::io::Error::other)?;
        }

        if !self.path_for(Role::Admin).exists() {
            let seed = vec![UserRecord {
                username: "admin".to_string(),
                password: hash_password("admin123"),
                email: "admin@ecowatt.com".to_string(),
                full_name: "System Administrator".to_string(),
                role: Role::Admin,
                created_at: now,
            }];
            self.write_collection(Role::Admin, &seed)
                .map_err(std::io::Error::other)?;
        }

        Ok(())
    }

    fn path_for(&self, role: Role) -> PathBuf {
        self.dir.join(role.file_name())
    }

    /// Read a role collection from disk
    ///
    /// A missing file reads as an empty collection, matching the
    /// create-if-absent lifecycle of the store.
    ///
    /// # Errors
    /// * Returns an error if the file cannot be read or parsed
    fn read_collection(&self, role: Role) -> Result<Vec<UserRecord>, String> {
        let path = self.path_for(role);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let mut file = match File::open(&path) {
            Ok(file) => file,
            Err(_) => return Err("Failed to open users file".to_string()),
        };

        let mut contents = String::new();
        if file.read_to_string(&mut contents).is_err() {
            return Err("Failed to read users file".to_string());
        }

        match serde_json::from_str(&contents) {
            Ok(records) => Ok(records),
            Err(_) => Err("Failed to parse users data".to_string()),
        }
    }

    /// Write a role collection to disk by full overwrite
    ///
    /// # Errors
    /// * Returns an error if the file cannot be created or written
    fn write_collection(&self, role: Role, records: &[UserRecord]) -> Result<(), String> {
        let json = match serde_json::to_string_pretty(records) {
            Ok(json) => json,
            Err(_) => return Err("Failed to serialize users data".to_string()),
        };

        let mut file = match File::create(self.path_for(role)) {
            Ok(file) => file,
            Err(_) => return Err("Failed to create users file".to_string()),
        };

        if file.write_all(json.as_bytes()).is_err() {
            return Err("Failed to write users data".to_string());
        }

        Ok(())
    }

    /// Authenticate a username/password pair against one role collection
    ///
    /// Hashes the supplied password and scans the collection for a record
    /// with a matching username and digest. The result does not reveal
    /// whether the username exists; callers report a single unified
    /// failure message.
    ///
    /// # Arguments
    /// * `username` - Username to look up
    /// * `password` - Plaintext password to check
    /// * `role` - Collection to search (user and admin logins are isolated)
    ///
    /// # Returns
    /// * `Result<Option<UserRecord>, String>` - The matching record, `None`
    ///   when no credential pair matches, or a store error
    pub fn authenticate(
        &self,
        username: &str,
        password: &str,
        role: Role,
    ) -> Result<Option<UserRecord>, String> {
        let digest = hash_password(password);

        Ok(self.get(username, role)?.filter(|r| r.password == digest))
    }

    /// Register a new account in one role collection
    ///
    /// The password is hashed before storage. Duplicate usernames and
    /// duplicate emails within the target collection are rejected with
    /// distinct messages.
    ///
    /// # Arguments
    /// * `username` - Unique username for the new account
    /// * `password` - Plaintext password (stored as a digest)
    /// * `email` - Email address, unique within the collection
    /// * `full_name` - Display name
    /// * `role` - Collection to register into
    ///
    /// # Errors
    /// * `"Username already exists"` / `"Email already exists"` on
    ///   duplicates; the store is left unchanged
    /// * Returns an error if any required field is empty
    pub fn register(
        &self,
        username: &str,
        password: &str,
        email: &str,
        full_name: &str,
        role: Role,
    ) -> Result<(), String> {
        if username.is_empty() || password.is_empty() || email.is_empty() || full_name.is_empty() {
            return Err("Username, email, full name and password cannot be empty".to_string());
        }

        let records = self.list(role)?;

        if records.iter().any(|r| r.username == username) {
            return Err("Username already exists".to_string());
        }

        if records.iter().any(|r| r.email == email) {
            return Err("Email already exists".to_string());
        }

        self.put(UserRecord {
            username: username.to_string(),
            password: hash_password(password),
            email: email.to_string(),
            full_name: full_name.to_string(),
            role,
            created_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        })
    }
}

impl Repository for UserStore {
    fn get(&self, username: &str, role: Role) -> Result<Option<UserRecord>, String> {
        let records = self.read_collection(role)?;
        Ok(records.into_iter().find(|r| r.username == username))
    }

    fn put(&self, record: UserRecord) -> Result<(), String> {
        let role = record.role;
        let mut records = self.read_collection(role)?;
        records.retain(|r| r.username != record.username);
        records.push(record);
        self.write_collection(role, &records)
    }

    fn delete(&self, username: &str, role: Role) -> Result<(), String> {
        let mut records = self.read_collection(role)?;
        records.retain(|r| r.username != username);
        self.write_collection(role, &records)
    }

    fn list(&self, role: Role) -> Result<Vec<UserRecord>, String> {
        self.read_collection(role)
    }
}
