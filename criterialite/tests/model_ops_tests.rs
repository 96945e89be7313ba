//! save / update / delete / refresh through a unit of work

#[path = "testutils/mod.rs"]
mod testutils;

use criterialite::Error;
use testutils::models::{names, Task, User};
use testutils::test_fixture::{TestFixture, JENS, MAX};

#[test]
fn test_save_assigns_ids_and_persists() {
    let fixture = TestFixture::new();

    let (user, task) = fixture
        .manager()
        .with_tx(|uow| {
            let mut user = User::new("eve@example.com", "eve", 2, 41);
            uow.save(&mut user)?;
            let mut task = Task::new("Task 6", Some(false), 2, Some("eve@example.com"));
            uow.save(&mut task)?;
            assert!(uow.contains(&task)?);
            uow.mark_dirty();
            Ok::<_, Error>((user, task))
        })
        .unwrap();

    assert_eq!(task.id, Some(6));
    let eve = fixture
        .users()
        .query()
        .unwrap()
        .by_natural_id("name", "eve")
        .unwrap();
    assert_eq!(eve, Some(user));

    let evening = fixture
        .tasks()
        .query()
        .unwrap()
        .join("creator")
        .unwrap()
        .eq("creator.name", "eve")
        .unwrap()
        .find_list()
        .unwrap();
    assert_eq!(evening, vec![task]);
}

#[test]
fn test_save_rejects_managed_entities() {
    let fixture = TestFixture::new();

    let result = fixture.manager().with_tx(|uow| {
        let mut jens = uow.find::<User>().by_id(JENS)?.expect("jens");
        uow.save(&mut jens)
    });
    assert!(matches!(result, Err(Error::InvalidState(_))));
}

#[test]
fn test_update_requires_managed_entity() {
    let fixture = TestFixture::new();
    let detached = fixture.tasks().by_id(2i64).unwrap().unwrap();

    let result = fixture.manager().with_tx(|uow| {
        let mut task = detached.clone();
        task.done = Some(true);
        uow.update(&task)
    });
    assert!(matches!(result, Err(Error::InvalidState(_))));

    fixture
        .manager()
        .with_tx(|uow| {
            let mut task = uow.find::<Task>().by_id(2i64)?.expect("task 2");
            task.done = Some(true);
            uow.update(&task)?;
            uow.mark_dirty();
            Ok::<_, Error>(())
        })
        .unwrap();

    let task = fixture.tasks().by_id(2i64).unwrap().unwrap();
    assert_eq!(task.done, Some(true));
    assert_eq!(task.creator.as_deref(), Some(MAX));
}

#[test]
fn test_delete() {
    let fixture = TestFixture::new();

    fixture
        .manager()
        .with_tx(|uow| {
            let finished = uow.query::<Task>()?.eq("done", true)?.find_list()?;
            for task in &finished {
                uow.delete(task)?;
                assert!(!uow.contains(task)?);
            }
            uow.mark_dirty();
            Ok::<_, Error>(())
        })
        .unwrap();

    assert_eq!(
        names(&fixture.tasks().all().unwrap()),
        vec!["Task 1", "Task 2", "Task 3", "jens"]
    );

    let missing = fixture.manager().with_tx(|uow| {
        let ghost = Task {
            id: Some(99),
            ..Task::new("ghost", None, 1, None)
        };
        uow.delete(&ghost)
    });
    assert!(matches!(missing, Err(Error::Session(_))));
}

#[test]
fn test_refresh_sees_committed_changes() {
    let fixture = TestFixture::new();
    let manager = fixture.manager();

    let refreshed = manager
        .with_read_only_tx(|reader| {
            let mut task = reader.find::<Task>().by_id(1i64)?.expect("task 1");
            assert_eq!(task.priority, 1);

            manager.with_tx(|writer| {
                let mut task = writer.find::<Task>().by_id(1i64)?.expect("task 1");
                task.priority = 7;
                writer.update(&task)?;
                writer.mark_dirty();
                Ok::<_, Error>(())
            })?;

            reader.refresh(&mut task)?;
            Ok::<_, Error>(task)
        })
        .unwrap();

    assert_eq!(refreshed.priority, 7);
}
