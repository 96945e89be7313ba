//! Unit-of-work commit protocol tests

#[path = "testutils/mod.rs"]
mod testutils;

use criterialite::{
    CriteriaConfig, Error, PersistenceSession, Record, TransactionManager, TxOptions, TxState,
};
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use testutils::models::{Task, User};
use testutils::test_fixture::{TestFixture, JENS, TOM};

#[test]
fn test_read_only_work_changes_nothing() {
    let fixture = TestFixture::new();
    let before = fixture.store().rows("task");

    let count = fixture
        .manager()
        .with_tx(|uow| {
            let _scratch = Task::new("never saved", None, 9, None);
            uow.find::<Task>().count()
        })
        .unwrap();

    assert_eq!(count, 5);
    assert_eq!(fixture.store().rows("task"), before);
}

#[test]
fn test_mutation_without_mark_dirty_is_rolled_back() {
    let fixture = TestFixture::new();

    fixture
        .manager()
        .with_tx(|uow| {
            let mut task = uow.find::<Task>().by_id(1i64)?.expect("task 1");
            task.done = Some(true);
            uow.update(&task)?;
            uow.save(&mut Task::new("Task 6", None, 2, None))?;
            assert!(!uow.needs_commit());
            Ok::<_, Error>(())
        })
        .unwrap();

    assert_eq!(fixture.task_count(), 5);
    let task = fixture.tasks().by_id(1i64).unwrap().unwrap();
    assert_eq!(task.done, Some(false));
}

#[test]
fn test_mark_dirty_commits_exactly_once() {
    let fixture = TestFixture::new();

    let saved = fixture
        .manager()
        .with_tx(|uow| {
            assert_eq!(uow.state(), TxState::SessionOpen);
            let mut task = Task::new("Task 6", None, 2, Some(TOM));
            uow.save(&mut task)?;
            uow.mark_dirty();
            Ok::<_, Error>(task)
        })
        .unwrap();

    assert_eq!(saved.id, Some(6));
    assert_eq!(fixture.task_count(), 6);
    let stored = fixture
        .tasks()
        .query()
        .unwrap()
        .eq("name", "Task 6")
        .unwrap()
        .find_list()
        .unwrap();
    assert_eq!(stored, vec![saved]);
}

#[test]
fn test_flag_does_not_leak_into_next_unit() {
    let fixture = TestFixture::new();
    let manager = fixture.manager();

    manager
        .with_tx(|uow| {
            uow.mark_dirty();
            Ok::<_, Error>(())
        })
        .unwrap();
    let dirty = manager
        .with_tx(|uow| Ok::<_, Error>(uow.needs_commit()))
        .unwrap();
    assert!(!dirty);
}

#[test]
fn test_uncommitted_changes_are_private() {
    let fixture = TestFixture::new();

    fixture
        .manager()
        .with_tx(|uow| {
            uow.save(&mut Task::new("Task 6", None, 2, None))?;
            assert_eq!(uow.find::<Task>().count()?, 6);
            assert_eq!(fixture.tasks().count()?, 5);
            assert_eq!(fixture.task_count(), 5);
            uow.mark_dirty();
            Ok::<_, Error>(())
        })
        .unwrap();

    assert_eq!(fixture.tasks().count().unwrap(), 6);
}

#[test]
fn test_failed_work_rolls_back_and_propagates() {
    let fixture = TestFixture::new();

    let result: Result<(), Error> = fixture.manager().with_tx(|uow| {
        uow.save(&mut Task::new("Task 6", None, 2, None))?;
        uow.mark_dirty();
        Err(Error::InvalidState("business rule violated".to_string()))
    });

    match result {
        Err(Error::InvalidState(message)) => assert_eq!(message, "business rule violated"),
        other => panic!("expected the work's error, got {:?}", other),
    }
    assert_eq!(fixture.task_count(), 5);
}

#[test]
fn test_rollback_only_overrides_mark_dirty() {
    let fixture = TestFixture::new();

    fixture
        .manager()
        .with_tx(|uow| {
            uow.save(&mut Task::new("Task 6", None, 2, None))?;
            let duplicate = uow.save(&mut User::new(JENS, "jens again", 1, 40));
            assert!(matches!(duplicate, Err(Error::Session(_))));
            assert!(uow.session().transaction().is_rollback_only());
            uow.mark_dirty();
            Ok::<_, Error>(())
        })
        .unwrap();

    assert_eq!(fixture.task_count(), 5);
    assert_eq!(fixture.store().count_rows("user"), 3);
}

#[test]
fn test_panicking_work_rolls_back_and_releases_session() {
    let fixture = TestFixture::new();
    let captured: Mutex<Option<Arc<dyn PersistenceSession>>> = Mutex::new(None);

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let _: Result<(), Error> = fixture.manager().with_tx(|uow| {
            *captured.lock() = Some(Arc::clone(uow.session()));
            uow.save(&mut Task::new("Task 6", None, 2, None))?;
            uow.mark_dirty();
            panic!("work failed halfway");
        });
    }));

    assert!(outcome.is_err());
    let session = captured.lock().take().expect("work ran");
    assert!(!session.is_open());
    assert!(!session.transaction().is_active());
    assert_eq!(fixture.task_count(), 5);
}

#[test]
fn test_sessions_are_released_after_every_unit() {
    let fixture = TestFixture::new();

    let session = fixture
        .manager()
        .with_tx(|uow| Ok::<_, Error>(Arc::clone(uow.session())))
        .unwrap();
    assert!(!session.is_open());

    let session = fixture
        .manager()
        .with_read_only_tx(|uow| Ok::<_, Error>(Arc::clone(uow.session())))
        .unwrap();
    assert!(!session.is_open());
}

#[test]
fn test_read_only_units_cannot_write() {
    let fixture = TestFixture::new();

    let result = fixture.manager().with_read_only_tx(|uow| {
        assert!(uow.options().read_only);
        assert!(!uow.session().transaction().is_active());
        uow.save(&mut Task::new("Task 6", None, 2, None))
    });

    assert!(matches!(result, Err(Error::Transaction(_))));
    assert_eq!(fixture.task_count(), 5);
}

#[test]
fn test_configured_defaults() {
    let fixture = TestFixture::new();
    let config = CriteriaConfig {
        default_read_only: true,
        ..CriteriaConfig::default()
    };
    let manager =
        TransactionManager::with_config(Arc::new(fixture.store().clone()), config).unwrap();
    assert!(manager.config().default_read_only);

    let active = manager
        .with_tx(|uow| Ok::<_, Error>(uow.session().transaction().is_active()))
        .unwrap();
    assert!(!active);

    let result: Result<(), Error> =
        manager.with_tx_options(TxOptions::new("archive"), |_| Ok(()));
    assert!(matches!(result, Err(Error::Session(_))));

    let store = fixture.store().clone().with_unit("archive");
    let manager = TransactionManager::new(Arc::new(store));
    let unit = manager
        .with_tx_options(TxOptions::new("archive"), |uow| {
            Ok::<_, Error>(uow.options().unit.clone())
        })
        .unwrap();
    assert_eq!(unit, "archive");
}

#[test]
fn test_concurrent_units_of_work() {
    let fixture = TestFixture::new();
    let manager = fixture.manager();

    std::thread::scope(|s| {
        for worker in 0..4 {
            s.spawn(move || {
                manager
                    .with_tx(|uow| {
                        let mut task = Task::new(&format!("Worker {}", worker), None, 1, None);
                        uow.save(&mut task)?;
                        uow.mark_dirty();
                        Ok::<_, Error>(())
                    })
                    .unwrap();
            });
        }
    });

    assert_eq!(fixture.task_count(), 9);
    let workers = fixture
        .tasks()
        .query()
        .unwrap()
        .ilike("name", "worker %")
        .unwrap()
        .find_list()
        .unwrap();
    let mut ids: Vec<i64> = workers.iter().filter_map(|t| t.id).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 4);
}

#[test]
fn test_manual_transaction_control() {
    let fixture = TestFixture::new();
    let session = fixture.manager().open_session("default").unwrap();

    TransactionManager::rollback(session.as_ref()).unwrap();

    TransactionManager::begin(session.as_ref()).unwrap();
    session
        .persist(
            "task",
            Record::new()
                .with("name", "Task 6")
                .with("priority", 2i64),
        )
        .unwrap();
    TransactionManager::rollback(session.as_ref()).unwrap();
    assert_eq!(fixture.task_count(), 5);

    TransactionManager::begin(session.as_ref()).unwrap();
    session
        .persist(
            "task",
            Record::new()
                .with("name", "Task 7")
                .with("priority", 2i64),
        )
        .unwrap();
    TransactionManager::commit(session.as_ref()).unwrap();
    assert_eq!(fixture.task_count(), 6);

    assert!(matches!(
        TransactionManager::commit(session.as_ref()),
        Err(Error::Transaction(_))
    ));
    session.close().unwrap();
}
