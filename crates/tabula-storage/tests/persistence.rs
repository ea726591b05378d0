//! File-backed SQLite behavior and table creation across connections.

use tabula_core::{model, Model};
use tabula_storage::{Database, DatabaseConfig, Migrations, StorageError};

model! {
    #[derive(Debug, Clone, Default, PartialEq)]
    struct Account {
        #[db = "id,primary_key,auto_increment"]
        id: i64,
        #[db = "email,not_null,unique,size:120"]
        email: String,
        #[db = "active,default:1"]
        active: bool,
    }
}

impl Model for Account {}

model! {
    #[derive(Debug, Clone, Default, PartialEq)]
    struct Session {
        #[db = "token,primary_key"]
        token: String,
        #[db = "account_id,not_null"]
        account_id: i64,
    }
}

impl Model for Session {}

fn url(dir: &tempfile::TempDir) -> String {
    format!("sqlite://{}", dir.path().join("app.db").display())
}

#[test]
fn test_file_database_persists_across_connections() {
    let dir = tempfile::tempdir().unwrap();
    let migrations = Migrations::new().model::<Account>().model::<Session>();

    let first = Database::connect(&url(&dir)).unwrap();
    migrations.run(&first).unwrap();
    let mut account = Account {
        id: 0,
        email: "ada@example.com".into(),
        active: true,
    };
    first.create(&mut account).unwrap();
    first
        .create(&mut Session {
            token: "t-1".into(),
            account_id: account.id,
        })
        .unwrap();
    first.close().unwrap();
    assert!(matches!(first.find_all::<Account>(), Err(StorageError::Closed)));

    let second = Database::from_config(&DatabaseConfig {
        url: url(&dir),
        debug: true,
    })
    .unwrap();
    migrations.run(&second).unwrap();
    let loaded: Account = second.find_by_key(account.id).unwrap();
    assert_eq!(loaded, account);
    let session: Session = second.find_by_key("t-1").unwrap();
    assert_eq!(session.account_id, account.id);
}

#[test]
fn test_ensure_table_is_idempotent_on_both_backends() {
    for db in [Database::mock(), Database::sqlite_memory().unwrap()] {
        db.auto_migrate::<Account>().unwrap();
        db.create(&mut Account {
            id: 0,
            email: "grace@example.com".into(),
            active: false,
        })
        .unwrap();
        db.auto_migrate::<Account>().unwrap();
        assert_eq!(db.find_all::<Account>().unwrap().len(), 1);
    }
}

#[test]
fn test_text_keys_are_not_generated() {
    for db in [Database::mock(), Database::sqlite_memory().unwrap()] {
        db.ensure_table::<Session>().unwrap();
        let mut session = Session {
            token: "abc".into(),
            account_id: 7,
        };
        db.create(&mut session).unwrap();
        assert_eq!(session.token, "abc");
        assert!(db.create(&mut session.clone()).is_err());

        session.account_id = 8;
        db.update_by_key(&mut session, "abc").unwrap();
        let loaded: Session = db.find_by_key("abc").unwrap();
        assert_eq!(loaded.account_id, 8);
    }
}
