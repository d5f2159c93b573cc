use bookshelf_core::db::open_db_in_memory;
use bookshelf_core::{
    Book, BookPatch, BookRepository, BookService, FieldUpdate, RepoError, SqliteBookRepository,
    UpdateOutcome, ValidationError,
};
use rusqlite::Connection;

fn full_book() -> Book {
    Book {
        id: None,
        title: "The Hobbit".to_string(),
        author: Some("J.R.R. Tolkien".to_string()),
        year: Some(1937),
        genre: Some("Fantasy".to_string()),
        rating: Some(5),
        notes: Some("Reread every winter".to_string()),
    }
}

#[test]
fn create_and_get_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteBookRepository::try_new(&conn).unwrap();

    let book = full_book();
    let id = repo.create_book(&book).unwrap();

    let loaded = repo.get_book(id).unwrap().unwrap();
    assert_eq!(
        loaded,
        Book {
            id: Some(id),
            ..book
        }
    );
}

#[test]
fn create_keeps_absent_fields_absent() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteBookRepository::try_new(&conn).unwrap();

    let id = repo.create_book(&Book::new("Untitled Draft")).unwrap();
    let loaded = repo.get_book(id).unwrap().unwrap();
    assert_eq!(loaded.author, None);
    assert_eq!(loaded.year, None);
    assert_eq!(loaded.genre, None);
    assert_eq!(loaded.rating, None);
    assert_eq!(loaded.notes, None);

    let author_is_null: bool = conn
        .query_row("SELECT author IS NULL FROM books WHERE id = ?1;", [id], |row| {
            row.get(0)
        })
        .unwrap();
    assert!(author_is_null);
}

#[test]
fn create_rejects_empty_title_without_writing() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteBookRepository::try_new(&conn).unwrap();

    let err = repo.create_book(&Book::new("  ")).unwrap_err();
    assert!(matches!(err, RepoError::Validation(ValidationError::EmptyTitle)));
    assert_eq!(row_count(&conn), 0);
}

#[test]
fn create_ignores_caller_supplied_id() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteBookRepository::try_new(&conn).unwrap();

    let mut book = Book::new("Kindred");
    book.id = Some(42);
    let id = repo.create_book(&book).unwrap();
    assert_eq!(id, 1);
    assert!(repo.get_book(42).unwrap().is_none());
}

#[test]
fn create_stores_empty_optional_text_as_absent() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteBookRepository::try_new(&conn).unwrap();

    let book = Book {
        author: Some(String::new()),
        genre: Some(String::new()),
        notes: Some(String::new()),
        ..Book::new("Blank Margins")
    };
    let id = repo.create_book(&book).unwrap();

    let loaded = repo.get_book(id).unwrap().unwrap();
    assert_eq!(loaded.author, None);
    assert_eq!(loaded.genre, None);
    assert_eq!(loaded.notes, None);
}

#[test]
fn setting_empty_optional_text_clears_it() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteBookRepository::try_new(&conn).unwrap();
    let id = repo.create_book(&full_book()).unwrap();

    let patch = BookPatch {
        author: FieldUpdate::Set(String::new()),
        genre: FieldUpdate::Set(String::new()),
        notes: FieldUpdate::Set(String::new()),
        ..BookPatch::default()
    };
    assert_eq!(repo.update_book(id, &patch).unwrap(), UpdateOutcome::Updated);

    let loaded = repo.get_book(id).unwrap().unwrap();
    assert_eq!(loaded.author, None);
    assert_eq!(loaded.genre, None);
    assert_eq!(loaded.notes, None);
    assert_eq!(loaded.title, "The Hobbit");
}

#[test]
fn get_missing_returns_none() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteBookRepository::try_new(&conn).unwrap();

    assert!(repo.get_book(404).unwrap().is_none());
}

#[test]
fn ids_are_not_reused_after_delete() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteBookRepository::try_new(&conn).unwrap();

    let first = repo.create_book(&Book::new("One")).unwrap();
    let second = repo.create_book(&Book::new("Two")).unwrap();
    repo.delete_book(second).unwrap();

    let third = repo.create_book(&Book::new("Three")).unwrap();
    assert!(third > second);
    assert!(second > first);
}

#[test]
fn empty_patch_reports_nothing_to_update() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteBookRepository::try_new(&conn).unwrap();
    let id = repo.create_book(&full_book()).unwrap();

    let outcome = repo.update_book(id, &BookPatch::default()).unwrap();
    assert_eq!(outcome, UpdateOutcome::NothingToUpdate);
    assert_eq!(repo.get_book(id).unwrap().unwrap().title, "The Hobbit");
}

#[test]
fn empty_patch_on_missing_id_issues_no_write() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteBookRepository::try_new(&conn).unwrap();

    let outcome = repo.update_book(99, &BookPatch::default()).unwrap();
    assert_eq!(outcome, UpdateOutcome::NothingToUpdate);
}

#[test]
fn title_only_patch_leaves_other_fields() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteBookRepository::try_new(&conn).unwrap();
    let original = full_book();
    let id = repo.create_book(&original).unwrap();

    let patch = BookPatch {
        title: FieldUpdate::Set("There and Back Again".to_string()),
        ..BookPatch::default()
    };
    assert_eq!(repo.update_book(id, &patch).unwrap(), UpdateOutcome::Updated);

    let loaded = repo.get_book(id).unwrap().unwrap();
    assert_eq!(
        loaded,
        Book {
            id: Some(id),
            title: "There and Back Again".to_string(),
            ..original
        }
    );
}

#[test]
fn patch_sets_several_fields_at_once() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteBookRepository::try_new(&conn).unwrap();
    let id = repo.create_book(&Book::new("Neuromancer")).unwrap();

    let patch = BookPatch {
        author: FieldUpdate::Set("William Gibson".to_string()),
        year: FieldUpdate::Set(1984),
        rating: FieldUpdate::Set(4),
        ..BookPatch::default()
    };
    repo.update_book(id, &patch).unwrap();

    let loaded = repo.get_book(id).unwrap().unwrap();
    assert_eq!(loaded.title, "Neuromancer");
    assert_eq!(loaded.author.as_deref(), Some("William Gibson"));
    assert_eq!(loaded.year, Some(1984));
    assert_eq!(loaded.rating, Some(4));
    assert_eq!(loaded.genre, None);
}

#[test]
fn explicit_clear_removes_optional_value() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteBookRepository::try_new(&conn).unwrap();
    let id = repo.create_book(&full_book()).unwrap();

    let patch = BookPatch {
        notes: FieldUpdate::Clear,
        rating: FieldUpdate::Clear,
        ..BookPatch::default()
    };
    repo.update_book(id, &patch).unwrap();

    let loaded = repo.get_book(id).unwrap().unwrap();
    assert_eq!(loaded.notes, None);
    assert_eq!(loaded.rating, None);
    assert_eq!(loaded.author.as_deref(), Some("J.R.R. Tolkien"));
}

#[test]
fn keep_never_clears_a_stored_value() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteBookRepository::try_new(&conn).unwrap();
    let id = repo.create_book(&full_book()).unwrap();

    let patch = BookPatch {
        year: FieldUpdate::from_option(None),
        genre: FieldUpdate::from_option(Some("Classic".to_string())),
        ..BookPatch::default()
    };
    repo.update_book(id, &patch).unwrap();

    let loaded = repo.get_book(id).unwrap().unwrap();
    assert_eq!(loaded.year, Some(1937));
    assert_eq!(loaded.genre.as_deref(), Some("Classic"));
}

#[test]
fn clearing_or_blanking_title_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteBookRepository::try_new(&conn).unwrap();
    let id = repo.create_book(&full_book()).unwrap();

    let clear = BookPatch {
        title: FieldUpdate::Clear,
        ..BookPatch::default()
    };
    let err = repo.update_book(id, &clear).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::RequiredFieldCleared("title"))
    ));

    let blank = BookPatch {
        title: FieldUpdate::Set(" ".to_string()),
        ..BookPatch::default()
    };
    let err = repo.update_book(id, &blank).unwrap_err();
    assert!(matches!(err, RepoError::Validation(ValidationError::EmptyTitle)));

    assert_eq!(repo.get_book(id).unwrap().unwrap().title, "The Hobbit");
}

#[test]
fn update_missing_id_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteBookRepository::try_new(&conn).unwrap();

    let patch = BookPatch {
        genre: FieldUpdate::Set("Poetry".to_string()),
        ..BookPatch::default()
    };
    let err = repo.update_book(7, &patch).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(7)));
}

#[test]
fn update_values_are_bound_not_interpolated() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteBookRepository::try_new(&conn).unwrap();
    let id = repo.create_book(&Book::new("Plain")).unwrap();

    let hostile = "x', title = 'pwned' WHERE 1 = 1; --";
    let patch = BookPatch {
        notes: FieldUpdate::Set(hostile.to_string()),
        ..BookPatch::default()
    };
    repo.update_book(id, &patch).unwrap();

    let loaded = repo.get_book(id).unwrap().unwrap();
    assert_eq!(loaded.title, "Plain");
    assert_eq!(loaded.notes.as_deref(), Some(hostile));
}

#[test]
fn delete_then_get_returns_none() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteBookRepository::try_new(&conn).unwrap();
    let id = repo.create_book(&full_book()).unwrap();

    assert!(repo.delete_book(id).unwrap());
    assert!(repo.get_book(id).unwrap().is_none());
}

#[test]
fn delete_is_idempotent() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteBookRepository::try_new(&conn).unwrap();
    let id = repo.create_book(&full_book()).unwrap();

    assert!(repo.delete_book(id).unwrap());
    assert!(!repo.delete_book(id).unwrap());
    assert!(!repo.delete_book(12345).unwrap());
}

#[test]
fn service_wraps_repository_calls() {
    let conn = open_db_in_memory().unwrap();
    let service = BookService::new(SqliteBookRepository::try_new(&conn).unwrap());

    let id = service.add_book(&full_book()).unwrap();
    assert_eq!(service.get_book(id).unwrap().unwrap().title, "The Hobbit");

    let patch = BookPatch {
        rating: FieldUpdate::Set(4),
        ..BookPatch::default()
    };
    assert_eq!(service.edit_book(id, &patch).unwrap(), UpdateOutcome::Updated);
    assert_eq!(service.get_book(id).unwrap().unwrap().rating, Some(4));

    assert!(service.remove_book(id).unwrap());
    assert!(service.get_book(id).unwrap().is_none());
}

fn row_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM books;", [], |row| row.get(0))
        .unwrap()
}
