use std::{sync::Arc, time::Duration};

use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use rstest::{fixture, rstest};

use super::*;
use crate::{
    access::Caller,
    error::HelpdeskError,
    filter::FilterCriteria,
    notify::{BuiltinRenderer, Mailer, NotificationComposer, RecordingRelay},
    paging::PagingService,
    params::{DbParameterStore, Param},
    status::TicketStatus,
    test_support::{TempDatabase, ids, sample_form, seeded_database},
};

struct Harness {
    db: TempDatabase,
    relay: Arc<RecordingRelay>,
    tickets: TicketService,
    catalog: CatalogService,
    parameters: ParameterService,
}

impl Harness {
    fn subjects(&self) -> Vec<String> {
        self.relay
            .messages()
            .into_iter()
            .map(|m| m.subject)
            .collect()
    }
}

#[fixture]
async fn harness() -> Harness {
    let db = seeded_database().await.expect("seeded database");
    let relay = Arc::new(RecordingRelay::default());
    let composer = NotificationComposer::new(
        Arc::new(DbParameterStore::new(db.pool.clone())),
        Arc::new(BuiltinRenderer),
    );
    let tickets = TicketService::new(
        db.pool.clone(),
        composer,
        Mailer::new(relay.clone()),
        PagingService::new(10),
    );
    Harness {
        catalog: CatalogService::new(db.pool.clone()),
        parameters: ParameterService::new(db.pool.clone()),
        tickets,
        relay,
        db,
    }
}

fn admin() -> Caller { Caller::new("alice", true) }

fn submitter() -> Caller { Caller::new("jdoe", false) }

async fn submit(h: &Harness) -> String {
    let created = h
        .tickets
        .create(&sample_form(ids::HVAC, Some(ids::MAIN_CAMPUS)), &submitter())
        .await
        .expect("create");
    created.delivery.settle().await;
    created.value.ticket.id
}

#[rstest]
#[tokio::test]
async fn create_routes_to_submitter_and_owner(#[future] harness: Harness) {
    let h = harness.await;
    submit(&h).await;

    let messages = h.relay.messages();
    let [message] = messages.as_slice() else {
        panic!("expected one message, got {}", messages.len());
    };
    let to: Vec<String> = message.to.iter().map(|m| m.email.to_string()).collect();
    let cc: Vec<String> = message.cc.iter().map(|m| m.email.to_string()).collect();
    assert_eq!(to, ["jdoe@example.org", "hvac-tech@example.org"]);
    assert_eq!(cc, ["facilities@example.org", "main@example.org"]);
    assert!(message.subject.starts_with("New Ticket Created - "));
}

#[rstest]
#[tokio::test]
async fn resolving_update_closes_and_says_resolved(#[future] harness: Harness) {
    let h = harness.await;
    let id = submit(&h).await;
    let before = h.tickets.detail(&id, &submitter()).await.expect("detail");
    tokio::time::sleep(Duration::from_millis(20)).await;

    let updated = h
        .tickets
        .add_update(
            &id,
            &UpdateForm {
                notes: "fixed".to_owned(),
                is_resolved: true,
                status: None,
            },
            &Caller::new("hvac-tech", false),
        )
        .await
        .expect("update");
    updated.delivery.settle().await;

    let ticket = &updated.value.ticket;
    assert_eq!(ticket.status, TicketStatus::Closed);
    assert!(ticket.last_updated > before.ticket.last_updated);
    assert_eq!(updated.value.updates.len(), 1);
    let subjects = h.subjects();
    let last = subjects.last().expect("update notification");
    assert!(last.contains("Resolved"), "subject was {last}");
    assert!(!last.contains("Updated"));
}

#[rstest]
#[tokio::test]
async fn backward_update_is_rejected(#[future] harness: Harness) {
    let h = harness.await;
    let id = submit(&h).await;
    let forward = UpdateForm {
        notes: "on site".to_owned(),
        is_resolved: false,
        status: Some(TicketStatus::Monitoring),
    };
    h.tickets
        .add_update(&id, &forward, &admin())
        .await
        .expect("forward")
        .delivery
        .settle()
        .await;

    let backward = UpdateForm {
        notes: "oops".to_owned(),
        is_resolved: false,
        status: Some(TicketStatus::Reviewed),
    };
    let err = h
        .tickets
        .add_update(&id, &backward, &admin())
        .await
        .expect_err("backward move");
    assert!(matches!(err, HelpdeskError::Validation(e) if e.fields().first().map(|f| f.field) == Some("status")));
}

#[rstest]
#[tokio::test]
async fn blank_update_notes_are_rejected(#[future] harness: Harness) {
    let h = harness.await;
    let id = submit(&h).await;
    let err = h
        .tickets
        .add_update(
            &id,
            &UpdateForm {
                notes: "  ".to_owned(),
                is_resolved: true,
                status: None,
            },
            &admin(),
        )
        .await
        .expect_err("blank notes");
    assert!(matches!(err, HelpdeskError::Validation(_)));
}

#[rstest]
#[tokio::test]
async fn stale_edit_is_a_conflict(#[future] harness: Harness) {
    let h = harness.await;
    let id = submit(&h).await;
    let mut form = EditTicketForm {
        version: 0,
        ticket: sample_form(ids::HVAC, Some(ids::ANNEX)),
    };
    form.ticket.status = Some(TicketStatus::Reviewed);

    let first = h.tickets.edit(&id, &form, &admin()).await.expect("first edit");
    assert_eq!(first.value.ticket.version, 1);
    assert_eq!(first.value.ticket.status, TicketStatus::Reviewed);
    first.delivery.settle().await;

    let err = h.tickets.edit(&id, &form, &admin()).await.expect_err("stale");
    assert!(matches!(err, HelpdeskError::ConcurrencyConflict(ref t) if *t == id));
}

#[rstest]
#[tokio::test]
async fn editing_a_missing_ticket_is_not_found(#[future] harness: Harness) {
    let h = harness.await;
    let form = EditTicketForm {
        version: 0,
        ticket: sample_form(ids::HVAC, None),
    };
    let err = h.tickets.edit("missing", &form, &admin()).await.expect_err("missing");
    assert!(matches!(err, HelpdeskError::NotFound { entity: "ticket", .. }));
}

#[rstest]
#[tokio::test]
async fn ticket_in_deleted_category_can_still_be_closed(#[future] harness: Harness) {
    let h = harness.await;
    let id = submit(&h).await;
    h.catalog
        .delete_category(ids::HVAC, &admin())
        .await
        .expect("soft delete");

    let mut form = EditTicketForm {
        version: 0,
        ticket: sample_form(ids::HVAC, None),
    };
    form.ticket.status = Some(TicketStatus::Closed);
    let edited = h.tickets.edit(&id, &form, &admin()).await.expect("edit");
    edited.delivery.settle().await;
    assert_eq!(edited.value.ticket.status, TicketStatus::Closed);
    assert_eq!(edited.value.ticket.category_id, ids::HVAC);
    assert!(edited.value.category.deleted);
}

#[rstest]
#[tokio::test]
async fn edit_cannot_move_ticket_into_deleted_category(#[future] harness: Harness) {
    let h = harness.await;
    let id = submit(&h).await;
    h.catalog
        .delete_category(ids::IT, &admin())
        .await
        .expect("soft delete");

    let form = EditTicketForm {
        version: 0,
        ticket: sample_form(ids::IT, None),
    };
    let err = h.tickets.edit(&id, &form, &admin()).await.expect_err("deleted");
    let HelpdeskError::Validation(errors) = err else {
        panic!("expected validation error");
    };
    let fields: Vec<&str> = errors.fields().iter().map(|f| f.field).collect();
    assert_eq!(fields, ["category_id"]);
}

#[rstest]
#[case("All")]
#[case("Default")]
#[tokio::test]
async fn spanning_listing_keeps_deleted_category_tickets(#[future] harness: Harness, #[case] categories: &str) {
    let h = harness.await;
    submit(&h).await;
    h.catalog
        .delete_category(ids::HVAC, &admin())
        .await
        .expect("soft delete");

    let query = TicketQuery {
        criteria: FilterCriteria::parse(categories, "Default", "All").expect("criteria"),
        ..TicketQuery::default()
    };
    let page = h.tickets.list(&query, &admin()).await.expect("list");
    assert_eq!(page.page.total_items, 1);
}

#[rstest]
#[tokio::test]
async fn unmatched_versioned_write_is_classified(#[future] harness: Harness) {
    let h = harness.await;
    let kept = submit(&h).await;
    let gone = submit(&h).await;
    let mut conn = h.db.pool.get().await.expect("conn");
    crate::db::delete_ticket(&mut conn, &gone).await.expect("delete");

    let err = super::tickets::stale_write(&mut conn, &gone).await.expect("classify");
    assert!(matches!(err, HelpdeskError::NotFound { entity: "ticket", ref id } if *id == gone));
    let err = super::tickets::stale_write(&mut conn, &kept).await.expect("classify");
    assert!(matches!(err, HelpdeskError::ConcurrencyConflict(ref t) if *t == kept));
}

#[rstest]
#[tokio::test]
async fn closing_edit_uses_resolved_subject(#[future] harness: Harness) {
    let h = harness.await;
    let id = submit(&h).await;
    let mut form = EditTicketForm {
        version: 0,
        ticket: sample_form(ids::HVAC, None),
    };
    form.ticket.status = Some(TicketStatus::Closed);
    h.tickets
        .edit(&id, &form, &admin())
        .await
        .expect("edit")
        .delivery
        .settle()
        .await;
    assert!(h.subjects().iter().any(|s| s.starts_with("Ticket Resolved - ")));
}

#[rstest]
#[tokio::test]
async fn invalid_form_stores_nothing(#[future] harness: Harness) {
    let h = harness.await;
    let mut form = sample_form(ids::HVAC, Some("nowhere"));
    form.first_name = " ".to_owned();
    form.email = "not-an-address".to_owned();

    let err = h.tickets.create(&form, &submitter()).await.expect_err("invalid");
    let HelpdeskError::Validation(errors) = err else {
        panic!("expected validation error");
    };
    let fields: Vec<&str> = errors.fields().iter().map(|f| f.field).collect();
    assert_eq!(fields, ["first_name", "email", "location_id"]);

    let page = h
        .tickets
        .list(&TicketQuery::default(), &admin())
        .await
        .expect("list");
    assert!(page.tickets.is_empty());
    assert!(h.relay.messages().is_empty());
}

#[rstest]
#[case(Caller::new("alice", true), true)]
#[case(Caller::new("jdoe", false), true)]
#[case(Caller::new("hvac-tech", false), true)]
#[case(Caller::new("facilities", false), true)]
#[case(Caller::new("helpdesk", false), false)]
#[tokio::test]
async fn detail_respects_visibility(#[future] harness: Harness, #[case] caller: Caller, #[case] visible: bool) {
    let h = harness.await;
    let id = submit(&h).await;
    let result = h.tickets.detail(&id, &caller).await;
    if visible {
        assert_eq!(result.expect("visible").ticket.id, id);
    } else {
        assert!(matches!(result, Err(HelpdeskError::Forbidden(_))));
    }
}

#[rstest]
#[tokio::test]
async fn deleting_closed_ticket_as_admin_is_silent(#[future] harness: Harness) {
    let h = harness.await;
    let id = submit(&h).await;
    let mut form = EditTicketForm {
        version: 0,
        ticket: sample_form(ids::HVAC, None),
    };
    form.ticket.status = Some(TicketStatus::Closed);
    h.tickets
        .edit(&id, &form, &admin())
        .await
        .expect("close")
        .delivery
        .settle()
        .await;
    let sent = h.relay.messages().len();

    let deleted = h.tickets.delete(&id, &admin()).await.expect("delete");
    assert!(!deleted.delivery.was_dispatched());
    assert_eq!(h.relay.messages().len(), sent);
}

#[rstest]
#[tokio::test]
async fn deleting_open_ticket_as_admin_notifies(#[future] harness: Harness) {
    let h = harness.await;
    let id = submit(&h).await;
    let deleted = h.tickets.delete(&id, &admin()).await.expect("delete");
    assert!(deleted.delivery.was_dispatched());
    deleted.delivery.settle().await;
    assert!(h.subjects().iter().any(|s| s.starts_with("Ticket Deleted - ")));
    let err = h.tickets.detail(&id, &admin()).await.expect_err("gone");
    assert!(matches!(err, HelpdeskError::NotFound { .. }));
}

#[rstest]
#[tokio::test]
async fn deleting_as_submitter_never_notifies(#[future] harness: Harness) {
    let h = harness.await;
    let id = submit(&h).await;
    let deleted = h.tickets.delete(&id, &submitter()).await.expect("delete");
    assert!(!deleted.delivery.was_dispatched());
    assert_eq!(h.relay.messages().len(), 1);
}

#[rstest]
#[tokio::test]
async fn missing_sender_fails_after_commit(#[future] harness: Harness) {
    let h = harness.await;
    {
        use crate::schema::system_parameters::dsl as p;
        let mut conn = h.db.pool.get().await.expect("conn");
        diesel::delete(p::system_parameters.filter(p::id.eq(Param::Sender.id())))
            .execute(&mut conn)
            .await
            .expect("remove sender");
    }
    let err = h
        .tickets
        .create(&sample_form(ids::IT, None), &submitter())
        .await
        .expect_err("configuration");
    assert!(matches!(err, HelpdeskError::Configuration(_)));
    let page = h
        .tickets
        .list(&TicketQuery::default(), &admin())
        .await
        .expect("list");
    assert_eq!(page.tickets.len(), 1);
}

#[rstest]
#[tokio::test]
async fn listing_filters_by_username_suffix(#[future] harness: Harness) {
    let h = harness.await;
    submit(&h).await;
    h.tickets
        .create(&sample_form(ids::IT, None), &Caller::new("bsmith", false))
        .await
        .expect("create")
        .delivery
        .settle()
        .await;

    let query = TicketQuery {
        username: Some("smith".to_owned()),
        ..TicketQuery::default()
    };
    let page = h.tickets.list(&query, &admin()).await.expect("list");
    let owners: Vec<&str> = page.tickets.iter().map(|t| t.username.as_str()).collect();
    assert_eq!(owners, ["bsmith"]);
    assert_eq!(page.page.total_items, 1);
}

fn category_form(name: &str, parent: Option<&str>) -> CategoryForm {
    CategoryForm {
        name: name.to_owned(),
        parent_category_id: parent.map(str::to_owned),
        primary_contact: format!("{name} Contact"),
        user_name: "owner".to_owned(),
        primary_email: "owner@example.org".to_owned(),
        phone: None,
    }
}

#[rstest]
#[tokio::test]
async fn category_writes_require_admin(#[future] harness: Harness) {
    let h = harness.await;
    let err = h
        .catalog
        .create_category(&category_form("Printers", Some(ids::IT)), &submitter())
        .await
        .expect_err("forbidden");
    assert!(matches!(err, HelpdeskError::Forbidden(_)));
}

#[rstest]
#[tokio::test]
async fn categories_nest_one_level(#[future] harness: Harness) {
    let h = harness.await;
    let printers = h
        .catalog
        .create_category(&category_form("Printers", Some(ids::IT)), &admin())
        .await
        .expect("child of root");
    assert_eq!(printers.parent_category_id.as_deref(), Some(ids::IT));

    let err = h
        .catalog
        .create_category(&category_form("Toner", Some(ids::HVAC)), &admin())
        .await
        .expect_err("grandchild");
    assert!(
        matches!(err, HelpdeskError::Validation(ref e) if e.fields().first().map(|f| f.field) == Some("parent_category_id"))
    );

    let labels: Vec<String> = h
        .catalog
        .categories(false)
        .await
        .expect("list")
        .into_iter()
        .map(|v| v.display_name)
        .collect();
    assert_eq!(
        labels,
        ["Buildings - General", "Buildings - HVAC", "IT - General", "IT - Printers"]
    );
}

#[rstest]
#[tokio::test]
async fn parent_with_children_cannot_be_deleted(#[future] harness: Harness) {
    let h = harness.await;
    let err = h
        .catalog
        .delete_category(ids::BUILDINGS, &admin())
        .await
        .expect_err("has children");
    assert!(matches!(err, HelpdeskError::Validation(_)));

    h.catalog.delete_category(ids::HVAC, &admin()).await.expect("leaf");
    let deleted = h.catalog.category(ids::HVAC).await.expect("still readable");
    assert!(deleted.category.deleted);
    h.catalog
        .delete_category(ids::BUILDINGS, &admin())
        .await
        .expect("now childless");
}

#[rstest]
#[tokio::test]
async fn referenced_location_cannot_be_deleted(#[future] harness: Harness) {
    let h = harness.await;
    submit(&h).await;
    let err = h
        .catalog
        .delete_location(ids::MAIN_CAMPUS, &admin())
        .await
        .expect_err("in use");
    assert!(matches!(err, HelpdeskError::Validation(_)));
    h.catalog
        .delete_location(ids::ANNEX, &admin())
        .await
        .expect("unused");
    let err = h.catalog.location(ids::ANNEX).await.expect_err("gone");
    assert!(matches!(err, HelpdeskError::NotFound { .. }));
}

#[rstest]
#[tokio::test]
async fn location_fields_are_validated(#[future] harness: Harness) {
    let h = harness.await;
    let form = LocationForm {
        name: "Warehouse".to_owned(),
        address1: None,
        address2: None,
        city: None,
        state: Some("New York".to_owned()),
        zip: Some("1234".to_owned()),
        primary_contact: "Dock".to_owned(),
        primary_email: "dock@example.org".to_owned(),
        phone: "call me".to_owned(),
        send_email: false,
    };
    let err = h
        .catalog
        .create_location(&form, &admin())
        .await
        .expect_err("invalid");
    let HelpdeskError::Validation(errors) = err else {
        panic!("expected validation error");
    };
    let fields: Vec<&str> = errors.fields().iter().map(|f| f.field).collect();
    assert_eq!(fields, ["phone", "zip", "state"]);
}

#[rstest]
#[tokio::test]
async fn parameters_mask_passwords(#[future] harness: Harness) {
    let h = harness.await;
    h.parameters
        .update(Param::SmtpPassword.id(), "hunter2", &admin())
        .await
        .expect("set password");
    let views = h.parameters.list(&admin()).await.expect("list");
    let password = views
        .iter()
        .find(|v| v.id == Param::SmtpPassword.id())
        .expect("password row");
    assert_eq!(password.value, MASKED_VALUE);
    assert_eq!(password.updated_by, "alice");
}

#[rstest]
#[tokio::test]
async fn parameters_are_admin_only(#[future] harness: Harness) {
    let h = harness.await;
    let err = h.parameters.list(&submitter()).await.expect_err("forbidden");
    assert!(matches!(err, HelpdeskError::Forbidden(_)));
}

#[rstest]
#[tokio::test]
async fn locked_parameters_refuse_edits(#[future] harness: Harness) {
    let h = harness.await;
    {
        use crate::schema::system_parameters::dsl as p;
        let mut conn = h.db.pool.get().await.expect("conn");
        diesel::update(p::system_parameters.filter(p::id.eq(Param::SmtpHost.id())))
            .set(p::can_be_edited.eq(false))
            .execute(&mut conn)
            .await
            .expect("lock");
    }
    let err = h
        .parameters
        .update(Param::SmtpHost.id(), "mail.example.org", &admin())
        .await
        .expect_err("locked");
    assert!(matches!(err, HelpdeskError::Forbidden(_)));
}

#[rstest]
#[tokio::test]
async fn required_parameters_cannot_be_blanked(#[future] harness: Harness) {
    let h = harness.await;
    let err = h
        .parameters
        .update(Param::Sender.id(), "   ", &admin())
        .await
        .expect_err("required");
    assert!(matches!(err, HelpdeskError::Validation(_)));
}

#[rstest]
fn validation_patterns_compile() {
    assert!(super::PHONE.is_some());
    assert!(super::ZIP.is_some());
}

#[rstest]
#[case("555-555-5555", true)]
#[case("(555) 555.5555", true)]
#[case("555-5555", false)]
fn phone_shapes(#[case] raw: &str, #[case] ok: bool) {
    assert_eq!(super::is_phone(raw), ok);
}

#[rstest]
#[case("12345", true)]
#[case("12345-6789", true)]
#[case("1234", false)]
fn zip_shapes(#[case] raw: &str, #[case] ok: bool) {
    assert_eq!(super::is_zip(raw), ok);
}
