//! Polymorphic reference index
//!
//! Records of several kinds point at primary entities through a
//! `(type, id)` column pair instead of a typed foreign key. The pairs are not
//! uniform across tables, so each dependent kind is described explicitly here
//! and every cascade, purge and sweep statement is built from these
//! descriptors. A wrong pair silently matches nothing, which is why the index
//! is checked against the live schema at startup.

mod kind;

pub use kind::{PrimaryKind, RecordKind};

use crate::error::{is_schema_mismatch, EngineError};
use once_cell::sync::Lazy;
use sea_orm::sea_query::{Alias, DeleteStatement, Expr, Query, SelectStatement};
use sea_orm::{ConnectionTrait, DbBackend, DbErr, Statement};
use std::collections::BTreeSet;

/// How one dependent record kind references primary entities.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferenceDescriptor {
    pub record: RecordKind,
    pub table: &'static str,
    pub type_column: &'static str,
    pub id_column: &'static str,
    /// Primary kinds this record may point at.
    pub targets: &'static [PrimaryKind],
}

impl ReferenceDescriptor {
    pub fn references(&self, kind: PrimaryKind) -> bool {
        self.targets.contains(&kind)
    }

    /// `DELETE FROM <table> WHERE <type> = kind AND <id> IN (ids)`
    pub fn delete_referencing(&self, kind: PrimaryKind, ids: &[i32]) -> DeleteStatement {
        Query::delete()
            .from_table(Alias::new(self.table))
            .and_where(Expr::col(Alias::new(self.type_column)).eq(kind.tag()))
            .and_where(Expr::col(Alias::new(self.id_column)).is_in(ids.iter().copied()))
            .to_owned()
    }

    /// `SELECT id FROM <table> WHERE <type> = kind AND <id> IN (ids)`
    pub fn select_referencing(&self, kind: PrimaryKind, ids: &[i32]) -> SelectStatement {
        Query::select()
            .column(Alias::new("id"))
            .from(Alias::new(self.table))
            .and_where(Expr::col(Alias::new(self.type_column)).eq(kind.tag()))
            .and_where(Expr::col(Alias::new(self.id_column)).is_in(ids.iter().copied()))
            .to_owned()
    }

    /// Rows tagged `kind` whose referenced primary row no longer exists.
    pub fn delete_orphans(&self, kind: PrimaryKind) -> DeleteStatement {
        Query::delete()
            .from_table(Alias::new(self.table))
            .and_where(Expr::col(Alias::new(self.type_column)).eq(kind.tag()))
            .and_where(
                Expr::col(Alias::new(self.id_column)).not_in_subquery(
                    Query::select()
                        .column(Alias::new("id"))
                        .from(Alias::new(kind.table()))
                        .to_owned(),
                ),
            )
            .to_owned()
    }

    /// Classify a failure of a statement built from this descriptor.
    ///
    /// Only an undefined table or column means the descriptor does not match
    /// the store. Locks, resets and pool timeouts stay retryable.
    pub fn classify(&self, e: DbErr) -> EngineError {
        if is_schema_mismatch(&e) {
            EngineError::IntegrityViolation(format!(
                "{} references via {}({}, {}): {}",
                self.record, self.table, self.type_column, self.id_column, e
            ))
        } else {
            EngineError::StoreUnavailable(e.to_string())
        }
    }
}

/// Deletion order: notifications, reports, votes, photos, then comment threads.
const STANDARD_DESCRIPTORS: [ReferenceDescriptor; 5] = [
    ReferenceDescriptor {
        record: RecordKind::Notification,
        table: "notifications",
        type_column: "entity_type",
        id_column: "entity_id",
        targets: &[
            PrimaryKind::Post,
            PrimaryKind::Review,
            PrimaryKind::Comment,
            PrimaryKind::Entity,
            PrimaryKind::User,
        ],
    },
    ReferenceDescriptor {
        record: RecordKind::Report,
        table: "reports",
        type_column: "reported_item_type",
        id_column: "reported_item_id",
        targets: &[
            PrimaryKind::Post,
            PrimaryKind::Review,
            PrimaryKind::Comment,
            PrimaryKind::Entity,
            PrimaryKind::User,
        ],
    },
    ReferenceDescriptor {
        record: RecordKind::Vote,
        table: "votes",
        type_column: "entity_type",
        id_column: "entity_id",
        targets: &[PrimaryKind::Post, PrimaryKind::Review, PrimaryKind::Comment],
    },
    ReferenceDescriptor {
        record: RecordKind::Photo,
        table: "photos",
        type_column: "type",
        id_column: "source_id",
        targets: &[
            PrimaryKind::Post,
            PrimaryKind::Review,
            PrimaryKind::Entity,
            PrimaryKind::User,
        ],
    },
    ReferenceDescriptor {
        record: RecordKind::Comment,
        table: "comments",
        type_column: "entity_type",
        id_column: "entity_id",
        targets: &[PrimaryKind::Post, PrimaryKind::Review, PrimaryKind::Entity],
    },
];

/// Global reference index, built once.
pub static REFERENCE_INDEX: Lazy<ReferenceIndex> = Lazy::new(ReferenceIndex::standard);

/// Ordered set of reference descriptors.
#[derive(Clone, Debug)]
pub struct ReferenceIndex {
    descriptors: Vec<ReferenceDescriptor>,
}

impl ReferenceIndex {
    pub fn new(descriptors: Vec<ReferenceDescriptor>) -> Self {
        Self { descriptors }
    }

    pub fn standard() -> Self {
        Self::new(STANDARD_DESCRIPTORS.to_vec())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReferenceDescriptor> {
        self.descriptors.iter()
    }

    /// Dependent kinds of `kind`, in deletion order.
    pub fn dependents_of(&self, kind: PrimaryKind) -> impl Iterator<Item = &ReferenceDescriptor> {
        self.descriptors.iter().filter(move |d| d.references(kind))
    }

    pub fn descriptor(&self, record: RecordKind) -> Option<&ReferenceDescriptor> {
        self.descriptors.iter().find(|d| d.record == record)
    }

    /// Check every configured table and column against the live schema.
    ///
    /// Fails with `IntegrityViolation` listing every missing piece.
    pub async fn validate<C>(&self, db: &C) -> Result<(), EngineError>
    where
        C: ConnectionTrait,
    {
        let mut missing = Vec::new();

        for kind in PrimaryKind::ALL {
            let columns = table_columns(db, kind.table()).await?;
            if !columns.contains("id") {
                missing.push(format!("{}.id", kind.table()));
            }
        }

        for d in &self.descriptors {
            let columns = table_columns(db, d.table).await?;
            if columns.is_empty() {
                missing.push(d.table.to_string());
                continue;
            }
            for column in ["id", d.type_column, d.id_column] {
                if !columns.contains(column) {
                    missing.push(format!("{}.{}", d.table, column));
                }
            }
        }

        if missing.is_empty() {
            log::info!(
                "Reference index validated: {} dependent kinds",
                self.descriptors.len()
            );
            Ok(())
        } else {
            log::error!("Reference index does not match schema: {:?}", missing);
            Err(EngineError::IntegrityViolation(format!(
                "missing from schema: {}",
                missing.join(", ")
            )))
        }
    }
}

/// Column names of `table`, empty when the table does not exist.
async fn table_columns<C>(db: &C, table: &str) -> Result<BTreeSet<String>, EngineError>
where
    C: ConnectionTrait,
{
    let backend = db.get_database_backend();
    let sql = match backend {
        DbBackend::Sqlite => "SELECT name AS column_name FROM pragma_table_info(?)",
        DbBackend::Postgres => {
            "SELECT column_name::text AS column_name FROM information_schema.columns \
             WHERE table_schema = current_schema() AND table_name = $1"
        }
        DbBackend::MySql => {
            "SELECT column_name AS column_name FROM information_schema.columns \
             WHERE table_schema = DATABASE() AND table_name = ?"
        }
    };

    let rows = db
        .query_all(Statement::from_sql_and_values(
            backend,
            sql,
            vec![table.into()],
        ))
        .await?;

    let mut columns = BTreeSet::new();
    for row in rows {
        columns.insert(row.try_get::<String>("", "column_name")?);
    }
    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_pairs_are_per_kind() {
        let index = ReferenceIndex::standard();

        let photo = index.descriptor(RecordKind::Photo).unwrap();
        assert_eq!((photo.type_column, photo.id_column), ("type", "source_id"));

        let report = index.descriptor(RecordKind::Report).unwrap();
        assert_eq!(
            (report.type_column, report.id_column),
            ("reported_item_type", "reported_item_id")
        );

        for record in [RecordKind::Vote, RecordKind::Comment, RecordKind::Notification] {
            let d = index.descriptor(record).unwrap();
            assert_eq!((d.type_column, d.id_column), ("entity_type", "entity_id"));
        }
    }

    #[test]
    fn test_dependents_follow_deletion_order() {
        let index = ReferenceIndex::standard();
        let order: Vec<RecordKind> = index
            .dependents_of(PrimaryKind::Post)
            .map(|d| d.record)
            .collect();
        assert_eq!(
            order,
            vec![
                RecordKind::Notification,
                RecordKind::Report,
                RecordKind::Vote,
                RecordKind::Photo,
                RecordKind::Comment,
            ]
        );
    }

    #[test]
    fn test_comments_are_not_threads_of_comments() {
        let index = ReferenceIndex::standard();
        let kinds: Vec<RecordKind> = index
            .dependents_of(PrimaryKind::Comment)
            .map(|d| d.record)
            .collect();
        assert_eq!(
            kinds,
            vec![RecordKind::Notification, RecordKind::Report, RecordKind::Vote]
        );
    }

    #[test]
    fn test_delete_statement_uses_descriptor_columns() {
        let index = ReferenceIndex::standard();
        let photo = index.descriptor(RecordKind::Photo).unwrap();
        let sql = DbBackend::Postgres
            .build(&photo.delete_referencing(PrimaryKind::Post, &[42]))
            .to_string();
        assert!(sql.contains(r#""photos""#), "{}", sql);
        assert!(sql.contains(r#""type""#), "{}", sql);
        assert!(sql.contains(r#""source_id""#), "{}", sql);
        assert!(!sql.contains("entity_id"), "{}", sql);
    }

    #[test]
    fn test_transient_errors_are_not_integrity_violations() {
        let index = ReferenceIndex::standard();
        let vote = index.descriptor(RecordKind::Vote).unwrap();
        assert!(matches!(
            vote.classify(DbErr::Conn("reset".into())),
            EngineError::StoreUnavailable(_)
        ));
        let deadlock = vote.classify(DbErr::Exec(
            "error returned from database: deadlock detected".into(),
        ));
        assert!(deadlock.is_retryable(), "{:?}", deadlock);
        let locked = vote.classify(DbErr::Query(
            "error returned from database: database is locked".into(),
        ));
        assert!(locked.is_retryable(), "{:?}", locked);
        assert!(matches!(
            vote.classify(DbErr::Exec("no such table: votes".into())),
            EngineError::IntegrityViolation(_)
        ));
    }
}
