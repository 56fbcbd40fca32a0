//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{Duration, NaiveDate, Utc};
use safario_core::{
  account::{MAX_OTP_ATTEMPTS, NewAccount, OtpChallenge, Session},
  contact::NewContact,
  geo::Coordinates,
  profile::NewProfile,
  report::{
    AlertStatus, FirStatus, IncidentType, LostItemStatus, NewAlert, NewFirReport, NewLostItem,
  },
  role::{Role, RoleAssignment, RoleStatus},
  store::SafetyStore,
};
use uuid::Uuid;

use crate::{Error, SqliteStore};

const JAIPUR: Coordinates = Coordinates::new(26.9124, 75.7873);

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn account(s: &SqliteStore, email: &str) -> Uuid {
  s.create_account(NewAccount {
    email:         Some(email.to_owned()),
    phone_number:  None,
    password_hash: Some("$argon2id$stub".to_owned()),
  })
  .await
  .unwrap()
  .account_id
}

fn new_profile(user_id: Uuid) -> NewProfile {
  NewProfile {
    user_id,
    full_name: "Ravi Kumar".into(),
    date_of_birth: NaiveDate::from_ymd_opt(1990, 2, 1).unwrap(),
    gender: "male".into(),
    passport_number: Some("P9876543".into()),
    aadhaar_number: None,
    preferred_language: "English".into(),
    photo_url: None,
    phone_number: Some("+919800000000".into()),
  }
}

// ─── Accounts & sessions ─────────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_email_is_a_conflict() {
  let s = store().await;
  account(&s, "ravi@example.com").await;

  let err = s
    .create_account(NewAccount {
      email:         Some("ravi@example.com".into()),
      phone_number:  None,
      password_hash: None,
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Conflict(_)));
  assert!(SqliteStore::is_conflict(&err));
  assert!(!SqliteStore::is_conflict(&Error::NotFound { entity: "account", id: "x".into() }));
}

#[tokio::test]
async fn email_lookup_ignores_case() {
  let s = store().await;
  let id = account(&s, "Ravi@Example.com").await;

  let creds = s
    .find_credentials_by_email("ravi@example.com".into())
    .await
    .unwrap()
    .expect("credentials");
  assert_eq!(creds.account.account_id, id);
  assert_eq!(creds.password_hash.as_deref(), Some("$argon2id$stub"));
}

#[tokio::test]
async fn phone_accounts_are_found_by_number() {
  let s = store().await;
  let created = s
    .create_account(NewAccount {
      email:         None,
      phone_number:  Some("+919812345678".into()),
      password_hash: None,
    })
    .await
    .unwrap();

  let found = s.find_account_by_phone("+919812345678".into()).await.unwrap();
  assert_eq!(found, Some(created));
  assert!(s.find_account_by_phone("+10000000000".into()).await.unwrap().is_none());
}

#[tokio::test]
async fn session_lifecycle() {
  let s = store().await;
  let id = account(&s, "a@example.com").await;
  let now = Utc::now();
  let session = Session {
    token_hash: "abc123".into(),
    account_id: id,
    created_at: now,
    expires_at: now + Duration::hours(1),
  };

  s.create_session(session.clone()).await.unwrap();
  let fetched = s.get_session("abc123".into()).await.unwrap().expect("session");
  assert_eq!(fetched.account_id, id);
  assert!(!fetched.is_expired(now));

  assert!(s.delete_session("abc123".into()).await.unwrap());
  assert!(!s.delete_session("abc123".into()).await.unwrap());
  assert!(s.get_session("abc123".into()).await.unwrap().is_none());
}

// ─── OTP challenges ──────────────────────────────────────────────────────────

#[tokio::test]
async fn otp_challenge_is_replaced_and_counts_attempts() {
  let s = store().await;
  let phone = "+919812345678".to_owned();
  let expires_at = Utc::now() + Duration::minutes(10);

  s.put_otp_challenge(OtpChallenge {
    phone_number: phone.clone(),
    code_hash: "first".into(),
    expires_at,
    attempts: 0,
  })
  .await
  .unwrap();
  assert_eq!(s.claim_otp_attempt(phone.clone()).await.unwrap().unwrap().attempts, 1);
  let claimed = s.claim_otp_attempt(phone.clone()).await.unwrap().unwrap();
  assert_eq!((claimed.code_hash.as_str(), claimed.attempts), ("first", 2));
  assert_eq!(s.get_otp_challenge(phone.clone()).await.unwrap().unwrap().attempts, 2);

  s.put_otp_challenge(OtpChallenge {
    phone_number: phone.clone(),
    code_hash: "second".into(),
    expires_at,
    attempts: 0,
  })
  .await
  .unwrap();
  let c = s.get_otp_challenge(phone.clone()).await.unwrap().unwrap();
  assert_eq!((c.code_hash.as_str(), c.attempts), ("second", 0));

  s.delete_otp_challenge(phone.clone()).await.unwrap();
  assert!(s.get_otp_challenge(phone).await.unwrap().is_none());
}

#[tokio::test]
async fn otp_attempts_stop_at_the_limit() {
  let s = store().await;
  let phone = "+919812345678".to_owned();
  assert!(s.claim_otp_attempt(phone.clone()).await.unwrap().is_none());

  s.put_otp_challenge(OtpChallenge {
    phone_number: phone.clone(),
    code_hash: "h".into(),
    expires_at: Utc::now() + Duration::minutes(10),
    attempts: 0,
  })
  .await
  .unwrap();
  for n in 1..=MAX_OTP_ATTEMPTS {
    assert_eq!(s.claim_otp_attempt(phone.clone()).await.unwrap().unwrap().attempts, n);
  }
  assert!(s.claim_otp_attempt(phone.clone()).await.unwrap().is_none());
  assert_eq!(
    s.get_otp_challenge(phone).await.unwrap().unwrap().attempts,
    MAX_OTP_ATTEMPTS
  );
}

// ─── Roles ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn one_role_row_per_user() {
  let s = store().await;
  let id = account(&s, "a@example.com").await;
  s.insert_role(RoleAssignment::requested(id, Role::User, Utc::now())).await.unwrap();

  let err = s
    .insert_role(RoleAssignment::requested(id, Role::Admin, Utc::now()))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Conflict(_)));
}

#[tokio::test]
async fn role_update_persists() {
  let s = store().await;
  let id = account(&s, "officer@example.com").await;
  let mut role = RoleAssignment::requested(id, Role::Authority, Utc::now());
  s.insert_role(role.clone()).await.unwrap();

  role.approve(Utc::now()).unwrap();
  s.update_role(role).await.unwrap();

  let stored = s.get_role(id).await.unwrap().unwrap();
  assert_eq!((stored.role, stored.role_status), (Role::Authority, RoleStatus::Approved));
}

#[tokio::test]
async fn update_missing_role_is_not_found() {
  let s = store().await;
  let err = s
    .update_role(RoleAssignment::requested(Uuid::new_v4(), Role::User, Utc::now()))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::NotFound { .. }));
}

#[tokio::test]
async fn roles_list_pending_first_then_admins() {
  let s = store().await;
  let tourist = account(&s, "t@example.com").await;
  let pending = account(&s, "p@example.com").await;
  let admin = account(&s, "root@example.com").await;

  s.insert_role(RoleAssignment::requested(tourist, Role::User, Utc::now())).await.unwrap();
  s.insert_role(RoleAssignment::requested(pending, Role::Authority, Utc::now()))
    .await
    .unwrap();
  let mut root = RoleAssignment::requested(admin, Role::Admin, Utc::now());
  root.approve(Utc::now()).unwrap();
  s.insert_role(root).await.unwrap();

  let order: Vec<Uuid> = s.list_roles().await.unwrap().into_iter().map(|r| r.user_id).collect();
  assert_eq!(order, vec![pending, admin, tourist]);
}

// ─── Profiles ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn profile_is_created_once() {
  let s = store().await;
  let id = account(&s, "a@example.com").await;

  let profile = s.create_profile(new_profile(id)).await.unwrap();
  assert_eq!(s.get_profile(id).await.unwrap(), Some(profile));

  let err = s.create_profile(new_profile(id)).await.unwrap_err();
  assert!(matches!(err, Error::Conflict(_)));
}

#[tokio::test]
async fn profile_update_and_batch_lookup() {
  let s = store().await;
  let a = account(&s, "a@example.com").await;
  let b = account(&s, "b@example.com").await;
  let mut profile = s.create_profile(new_profile(a)).await.unwrap();

  profile.preferred_language = "Tamil".into();
  s.update_profile(profile).await.unwrap();
  assert_eq!(s.get_profile(a).await.unwrap().unwrap().preferred_language, "Tamil");

  // `b` has no profile and is simply absent.
  let found = s.list_profiles(vec![a, b]).await.unwrap();
  assert_eq!(found.len(), 1);
  assert_eq!(found[0].user_id, a);
  assert!(s.list_profiles(Vec::new()).await.unwrap().is_empty());
}

// ─── Alerts & FIRs ───────────────────────────────────────────────────────────

#[tokio::test]
async fn alerts_are_listed_newest_first_per_owner() {
  let s = store().await;
  let a = account(&s, "a@example.com").await;
  let b = account(&s, "b@example.com").await;

  let first = s.create_alert(NewAlert::new(a, JAIPUR, None)).await.unwrap();
  let second = s.create_alert(NewAlert::new(a, JAIPUR, Some("medical".into()))).await.unwrap();
  s.create_alert(NewAlert::new(b, JAIPUR, None)).await.unwrap();

  let mine = s.list_alerts(Some(a)).await.unwrap();
  assert_eq!(
    mine.iter().map(|x| x.alert_id).collect::<Vec<_>>(),
    vec![second.alert_id, first.alert_id]
  );
  assert_eq!(s.list_alerts(None).await.unwrap().len(), 3);
}

#[tokio::test]
async fn resolved_alert_round_trips() {
  let s = store().await;
  let a = account(&s, "a@example.com").await;
  let officer = account(&s, "officer@example.com").await;

  let mut alert = s.create_alert(NewAlert::new(a, JAIPUR, None)).await.unwrap();
  alert.resolve(officer, "Patrol dispatched", Utc::now()).unwrap();
  s.update_alert(alert.clone()).await.unwrap();

  let stored = s.get_alert(alert.alert_id).await.unwrap().unwrap();
  assert_eq!(stored.status, AlertStatus::Resolved);
  assert_eq!(stored.responder_id, Some(officer));
  assert_eq!(stored.response_notes.as_deref(), Some("Patrol dispatched"));
}

#[tokio::test]
async fn fir_status_update_persists() {
  let s = store().await;
  let a = account(&s, "a@example.com").await;
  let input = NewFirReport::new(a, IncidentType::Theft, "Bag snatched", JAIPUR, Utc::now())
    .unwrap();

  let mut fir = s.create_fir(input).await.unwrap();
  assert_eq!(fir.status, FirStatus::Filed);

  fir.advance(FirStatus::Investigating).unwrap();
  s.update_fir(fir.clone()).await.unwrap();
  assert_eq!(s.get_fir(fir.fir_id).await.unwrap().unwrap().status, FirStatus::Investigating);
  assert_eq!(s.list_firs(Some(a)).await.unwrap().len(), 1);
}

// ─── Lost items ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn lost_item_with_location_files_linked_fir() {
  let s = store().await;
  let a = account(&s, "a@example.com").await;
  let item = NewLostItem::new(a, "Passport", "Blue cover", None, Some(JAIPUR)).unwrap();
  let linked = item.linked_fir(Utc::now());

  let filing = s.file_lost_item(item, linked).await.unwrap();
  let fir = filing.fir.expect("linked fir");
  assert_eq!(filing.item.fir_id, Some(fir.fir_id));
  assert_eq!(fir.incident_type, IncidentType::LostDocuments);

  let stored = s.get_fir(fir.fir_id).await.unwrap().expect("fir persisted");
  assert_eq!(stored.fir_number, fir.fir_number);
  assert_eq!(s.get_lost_item(filing.item.item_id).await.unwrap(), Some(filing.item));
}

#[tokio::test]
async fn lost_item_filing_is_atomic() {
  let s = store().await;
  let a = account(&s, "a@example.com").await;

  let taken = NewFirReport::new(a, IncidentType::Other, "earlier", JAIPUR, Utc::now()).unwrap();
  let number = taken.fir_number.clone();
  s.create_fir(taken).await.unwrap();

  let item = NewLostItem::new(a, "Wallet", "", None, Some(JAIPUR)).unwrap();
  let mut clash = item.linked_fir(Utc::now()).unwrap();
  clash.fir_number = number;

  assert!(s.file_lost_item(item, Some(clash)).await.is_err());
  assert!(s.list_lost_items(Some(a), None).await.unwrap().is_empty());
  assert_eq!(s.list_firs(Some(a)).await.unwrap().len(), 1);
}

#[tokio::test]
async fn lost_items_respect_limit_and_status_updates() {
  let s = store().await;
  let a = account(&s, "a@example.com").await;
  for n in 0..3 {
    let item = NewLostItem::new(a, &format!("Item {n}"), "", None, None).unwrap();
    let filing = s.file_lost_item(item, None).await.unwrap();
    assert!(filing.fir.is_none());
  }

  let latest = s.list_lost_items(Some(a), Some(2)).await.unwrap();
  assert_eq!(latest.len(), 2);
  assert_eq!(latest[0].item_name, "Item 2");

  let mut item = latest[0].clone();
  item.set_status(LostItemStatus::Found, Utc::now());
  s.update_lost_item(item.clone()).await.unwrap();
  let stored = s.get_lost_item(item.item_id).await.unwrap().unwrap();
  assert_eq!(stored.status, LostItemStatus::Found);
  assert!(stored.found_at.is_some());
}

// ─── Contacts ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn contacts_are_private_to_their_owner() {
  let s = store().await;
  let a = account(&s, "a@example.com").await;
  let b = account(&s, "b@example.com").await;

  let contact = s
    .add_contact(NewContact {
      user_id:      a,
      name:         "Meera".into(),
      relationship: "Sister".into(),
      phone:        "+919811111111".into(),
      email:        None,
    })
    .await
    .unwrap();

  assert_eq!(s.list_contacts(a).await.unwrap(), vec![contact.clone()]);
  assert!(s.list_contacts(b).await.unwrap().is_empty());

  assert!(!s.delete_contact(b, contact.contact_id).await.unwrap());
  assert!(s.delete_contact(a, contact.contact_id).await.unwrap());
  assert!(s.list_contacts(a).await.unwrap().is_empty());
}

#[tokio::test]
async fn contacts_list_newest_first() {
  let s = store().await;
  let a = account(&s, "a@example.com").await;
  for name in ["Meera", "Arjun", "Kavya"] {
    s.add_contact(NewContact {
      user_id:      a,
      name:         name.into(),
      relationship: "Friend".into(),
      phone:        "+919811111111".into(),
      email:        None,
    })
    .await
    .unwrap();
  }
  let names: Vec<String> =
    s.list_contacts(a).await.unwrap().into_iter().map(|c| c.name).collect();
  assert_eq!(names, ["Kavya", "Arjun", "Meera"]);
}
