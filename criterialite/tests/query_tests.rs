//! Criteria builder tests against the seeded Task/User store

#[path = "testutils/mod.rs"]
mod testutils;

use criterialite::{Error, Predicate};
use testutils::models::{names, Task};
use testutils::test_fixture::{TestFixture, TOM};

#[test]
fn test_eq_returns_exactly_matching_rows() {
    let fixture = TestFixture::new();
    let tasks = fixture
        .tasks()
        .query()
        .unwrap()
        .eq("done", false)
        .unwrap()
        .find_list()
        .expect("find_list should succeed");

    assert_eq!(names(&tasks), vec!["Task 1", "Task 3", "jens"]);
    assert!(tasks.iter().all(|t| t.done == Some(false)));
}

#[test]
fn test_value_comparisons() {
    let fixture = TestFixture::new();
    let finder = fixture.tasks();
    let count = |q: criterialite::CriteriaBuilder<Task>| q.find_row_count().unwrap();

    assert_eq!(count(finder.query().unwrap().ge("priority", 3i64).unwrap()), 3);
    assert_eq!(count(finder.query().unwrap().gt("priority", 3i64).unwrap()), 1);
    assert_eq!(count(finder.query().unwrap().le("priority", 3i64).unwrap()), 4);
    assert_eq!(count(finder.query().unwrap().lt("priority", 3i64).unwrap()), 2);
    assert_eq!(count(finder.query().unwrap().ne("priority", 3i64).unwrap()), 3);
    assert_eq!(
        count(
            finder
                .query()
                .unwrap()
                .between("priority", 3i64, 6i64)
                .unwrap()
        ),
        3
    );
}

#[test]
fn test_property_comparisons_across_join() {
    let fixture = TestFixture::new();
    let joined = || fixture.tasks().query().unwrap().join("creator").unwrap();

    let same_name = joined()
        .eq_property("name", "creator.name")
        .unwrap()
        .find_list()
        .unwrap();
    assert_eq!(names(&same_name), vec!["jens"]);

    let other_name = joined().ne_property("name", "creator.name").unwrap();
    assert_eq!(other_name.find_row_count().unwrap(), 3);

    let above = joined()
        .gt_property("priority", "creator.default_priority")
        .unwrap()
        .find_list()
        .unwrap();
    assert_eq!(names(&above), vec!["Task 2", "Task 3"]);

    let below = joined()
        .lt_property("priority", "creator.default_priority")
        .unwrap()
        .find_list()
        .unwrap();
    assert_eq!(names(&below), vec!["Task 1", "jens"]);

    let at_least = joined()
        .ge_property("priority", "creator.default_priority")
        .unwrap();
    assert_eq!(at_least.find_row_count().unwrap(), 2);
    let at_most = joined()
        .le_property("priority", "creator.default_priority")
        .unwrap();
    assert_eq!(at_most.find_row_count().unwrap(), 2);
}

#[test]
fn test_case_insensitive_matching() {
    let fixture = TestFixture::new();
    let finder = fixture.tasks();

    let matching = finder.query().unwrap().ilike("name", "%ASK%").unwrap();
    assert_eq!(matching.find_row_count().unwrap(), 4);

    let task = finder
        .query()
        .unwrap()
        .ieq("name", "task 1")
        .unwrap()
        .find_unique()
        .unwrap()
        .expect("Task 1 should match");
    assert_eq!(task.name, "Task 1");
}

#[test]
fn test_null_checks() {
    let fixture = TestFixture::new();
    let finder = fixture.tasks();

    let undecided = finder.query().unwrap().is_null("done").unwrap().find_list().unwrap();
    assert_eq!(names(&undecided), vec!["Task 2"]);

    let decided = finder.query().unwrap().is_not_null("done").unwrap();
    assert_eq!(decided.find_row_count().unwrap(), 4);
}

#[test]
fn test_distinct_row_counts() {
    let fixture = TestFixture::new();
    let finder = fixture.tasks();

    assert_eq!(
        finder.query().unwrap().find_distinct_row_count("done").unwrap(),
        2
    );
    assert_eq!(
        finder
            .query()
            .unwrap()
            .join("creator")
            .unwrap()
            .find_distinct_row_count("creator.name")
            .unwrap(),
        3
    );
}

#[test]
fn test_inner_and_left_join() {
    let fixture = TestFixture::new();
    let finder = fixture.tasks();

    let joined = finder.query().unwrap().join("creator").unwrap().find_list().unwrap();
    assert_eq!(joined.len(), 4);
    let left = finder.query().unwrap().left_join("creator").unwrap().find_list().unwrap();
    assert_eq!(left.len(), 5);

    let toms = finder
        .query()
        .unwrap()
        .join("creator")
        .unwrap()
        .eq("creator.name", "tom")
        .unwrap()
        .find_list()
        .unwrap();
    assert_eq!(names(&toms), vec!["Task 3"]);
    assert_eq!(toms[0].creator.as_deref(), Some(TOM));

    let toms_or_nobody = finder
        .query()
        .unwrap()
        .left_join("creator")
        .unwrap()
        .or([
            Predicate::eq("creator.name", "tom"),
            Predicate::is_null("creator"),
        ])
        .unwrap()
        .find_list()
        .unwrap();
    assert_eq!(names(&toms_or_nobody), vec!["Task 3", "Task 4"]);
}

#[test]
fn test_unjoined_association_path_rejected() {
    let fixture = TestFixture::new();
    let result = fixture.tasks().query().unwrap().eq("creator.name", "tom");
    assert!(matches!(result, Err(Error::InvalidState(_))));

    let result = fixture
        .tasks()
        .query()
        .unwrap()
        .join("creator")
        .unwrap()
        .join("creator");
    assert!(matches!(result, Err(Error::InvalidState(_))));
}

#[test]
fn test_unknown_property_fails_at_execution() {
    let fixture = TestFixture::new();
    let query = fixture.tasks().query().unwrap().eq("colour", "red").unwrap();
    assert!(matches!(query.find_list(), Err(Error::Session(_))));
}

#[test]
fn test_find_unique() {
    let fixture = TestFixture::new();
    let finder = fixture.tasks();

    let result = finder.query().unwrap().eq("done", false).unwrap().find_unique();
    assert!(matches!(result, Err(Error::NonUniqueResult { count: 3 })));

    let done = finder
        .query()
        .unwrap()
        .eq("done", true)
        .unwrap()
        .find_unique()
        .unwrap()
        .expect("one finished task");
    assert_eq!(done.name, "Task 4");

    let nothing = finder.query().unwrap().eq("name", "Task 9").unwrap().find_unique();
    assert!(nothing.unwrap().is_none());
}

#[test]
fn test_membership() {
    let fixture = TestFixture::new();
    let finder = fixture.tasks();

    let listed = finder
        .query()
        .unwrap()
        .is_in("name", ["Task 1", "Task 2"])
        .unwrap()
        .find_list()
        .unwrap();
    assert_eq!(names(&listed), vec!["Task 1", "Task 2"]);

    let unlisted = finder
        .query()
        .unwrap()
        .not_in("name", ["Task 1", "Task 2"])
        .unwrap()
        .find_list()
        .unwrap();
    assert_eq!(names(&unlisted), vec!["Task 3", "Task 4", "jens"]);

    let empty: Vec<String> = Vec::new();
    let result = finder.query().unwrap().is_in("name", empty);
    assert!(matches!(result, Err(Error::InvalidArgument(_))));
}

#[test]
fn test_large_membership_lists_are_batched() {
    let fixture = TestFixture::new();
    let finder = fixture.tasks().with_max_in_size(2);
    let all_names = ["Task 1", "Task 2", "Task 3", "Task 4", "jens"];

    let query = finder.query().unwrap().is_in("name", all_names).unwrap();
    match query.predicates() {
        [Predicate::Or(clauses)] => assert_eq!(clauses.len(), 3),
        other => panic!("expected one disjunction, got {:?}", other),
    }
    assert_eq!(query.find_list().unwrap().len(), 5);

    let query = finder
        .query()
        .unwrap()
        .not_in("name", ["Task 1", "Task 2", "Task 3"])
        .unwrap();
    assert_eq!(query.predicates().len(), 2);
    assert_eq!(
        names(&query.find_list().unwrap()),
        vec!["Task 4", "jens"]
    );
}

#[test]
fn test_subqueries() {
    let fixture = TestFixture::new();
    let jens = fixture.users().query().unwrap().eq("name", "jens").unwrap();

    let named_like_user = fixture
        .tasks()
        .query()
        .unwrap()
        .in_subquery("name", &jens, "name")
        .unwrap()
        .find_list()
        .unwrap();
    assert_eq!(names(&named_like_user), vec!["jens"]);

    let others = fixture
        .tasks()
        .query()
        .unwrap()
        .not_in_subquery("name", &jens, "name")
        .unwrap();
    assert_eq!(others.find_row_count().unwrap(), 4);

    let by_jens = fixture
        .tasks()
        .query()
        .unwrap()
        .in_subquery("creator", &jens, "email")
        .unwrap()
        .find_list()
        .unwrap();
    assert_eq!(names(&by_jens), vec!["Task 1", "jens"]);
}

#[test]
fn test_restricted_clone_as_subquery() {
    let fixture = TestFixture::new();
    let important = fixture.tasks().query().unwrap().ge("priority", 2i64).unwrap();
    let open = important.clone().eq("done", false).unwrap();

    let query = important.in_subquery("id", &open, "id").unwrap();
    assert_eq!(names(&query.find_list().unwrap()), vec!["Task 3", "jens"]);
    assert_eq!(names(&open.find_list().unwrap()), vec!["Task 3", "jens"]);
}

#[test]
fn test_one_to_many_join_returns_distinct_roots() {
    let fixture = TestFixture::new();
    let query = fixture
        .users()
        .query()
        .unwrap()
        .join("tasks")
        .unwrap()
        .eq("tasks.done", false)
        .unwrap();

    let users = query.find_list().unwrap();
    let mut user_names: Vec<&str> = users.iter().map(|u| u.name.as_str()).collect();
    user_names.sort();
    assert_eq!(user_names, vec!["jens", "tom"]);

    assert_eq!(query.find_row_count().unwrap(), 3);
}

#[test]
fn test_max_value() {
    let fixture = TestFixture::new();
    assert_eq!(
        fixture.users().query().unwrap().find_max_value("age").unwrap(),
        30
    );
    let none = fixture
        .tasks()
        .query()
        .unwrap()
        .eq("name", "Task 9")
        .unwrap()
        .find_max_value("priority")
        .unwrap();
    assert_eq!(none, 0);
}

#[test]
fn test_ordering() {
    let fixture = TestFixture::new();
    let ordered = fixture
        .tasks()
        .query()
        .unwrap()
        .order_by_desc("priority")
        .unwrap()
        .order_by_asc("name")
        .unwrap()
        .find_list()
        .unwrap();
    let ordered: Vec<&str> = ordered.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(ordered, vec!["Task 3", "Task 2", "Task 4", "jens", "Task 1"]);

    let by_creator_age = fixture
        .tasks()
        .query()
        .unwrap()
        .join("creator")
        .unwrap()
        .order_by_asc("creator.age")
        .unwrap()
        .find_list()
        .unwrap();
    let by_creator_age: Vec<&str> = by_creator_age.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(by_creator_age, vec!["Task 3", "Task 2", "Task 1", "jens"]);
}

#[test]
fn test_row_count_rejects_ordered_query() {
    let fixture = TestFixture::new();
    let query = fixture
        .tasks()
        .query()
        .unwrap()
        .order_by_asc("name")
        .unwrap();
    assert!(query.has_ordering());
    assert!(matches!(query.find_row_count(), Err(Error::InvalidState(_))));
    assert!(matches!(
        query.find_distinct_row_count("done"),
        Err(Error::InvalidState(_))
    ));
}

#[test]
fn test_paging_bounds() {
    let fixture = TestFixture::new();
    let query = fixture
        .tasks()
        .query()
        .unwrap()
        .order_by_asc("priority")
        .unwrap()
        .set_first_result(1)
        .unwrap()
        .set_max_rows(2)
        .unwrap();
    let window: Vec<String> = query.find_list().unwrap().into_iter().map(|t| t.name).collect();
    assert_eq!(window, vec!["jens", "Task 2"]);

    let negative = fixture.tasks().query().unwrap().set_max_rows(-1);
    assert!(matches!(negative, Err(Error::InvalidArgument(_))));
    let negative = fixture.tasks().query().unwrap().set_first_result(-5);
    assert!(matches!(negative, Err(Error::InvalidArgument(_))));
}

#[test]
fn test_find_page_resets_bounds() {
    let fixture = TestFixture::new();
    let mut query = fixture
        .tasks()
        .query()
        .unwrap()
        .order_by_asc("priority")
        .unwrap()
        .order_by_asc("name")
        .unwrap();

    let page: Vec<String> = query
        .find_page(2, 2)
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect();
    assert_eq!(page, vec!["Task 2", "Task 4"]);
    assert_eq!(query.first_result(), 0);
    assert_eq!(query.max_rows(), 0);
    assert_eq!(query.find_list().unwrap().len(), 5);

    assert!(matches!(query.find_page(0, 2), Err(Error::InvalidArgument(_))));
    assert!(matches!(query.find_page(1, 0), Err(Error::InvalidArgument(_))));
}

#[test]
fn test_identity_lookups() {
    let fixture = TestFixture::new();

    let third = fixture.tasks().by_id(3i64).unwrap().expect("task 3 exists");
    assert_eq!(third.name, "Task 3");
    assert!(fixture.tasks().by_id(42i64).unwrap().is_none());

    let tom = fixture
        .users()
        .query()
        .unwrap()
        .by_natural_id("name", "tom")
        .unwrap()
        .expect("tom exists");
    assert_eq!(tom.email, TOM);

    let result = fixture.users().query().unwrap().by_natural_id("age", 20i64);
    assert!(matches!(result, Err(Error::InvalidArgument(_))));
}

#[test]
fn test_plan_rendering() {
    let fixture = TestFixture::new();
    let query = fixture
        .tasks()
        .query()
        .unwrap()
        .join("creator")
        .unwrap()
        .eq("creator.name", "tom")
        .unwrap();
    let alias = format!("creator_{}", query.alias_index());

    let rendered = query.plan().to_string();
    assert!(rendered.contains(&format!("join creator {}", alias)));
    assert!(rendered.contains(&format!("{}.name = 'tom'", alias)));
}
