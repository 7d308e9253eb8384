use blade_admin::models::{
    ChangePasswordForm, CreateModuleRequest, ListQuery, PatchProjectRequest, ProjectRequest, RegisterForm, User,
};
use serde_json::json;
use validator::Validate;

fn register_form() -> RegisterForm {
    serde_json::from_value(json!({
        "email": "alice@example.com",
        "name": "alice",
        "password": "secret1",
        "password2": "secret1",
        "cn_name": "Alice",
    }))
    .unwrap()
}

#[test]
fn test_register_form_rules() {
    let form = register_form();
    assert!(form.validate().is_ok());
    assert!(form.phone.is_empty());

    let mismatch = RegisterForm {
        password2: "secret2".to_string(),
        ..register_form()
    };
    assert!(mismatch.validate().is_err());

    let bad_email = RegisterForm {
        email: "not-an-email".to_string(),
        ..register_form()
    };
    assert!(bad_email.validate().is_err());

    let short = RegisterForm {
        password: "12345".to_string(),
        password2: "12345".to_string(),
        ..register_form()
    };
    assert!(short.validate().is_err());
}

#[test]
fn test_change_password_confirmation() {
    let form = ChangePasswordForm {
        old_password: "secret1".to_string(),
        new_password: "secret2".to_string(),
        new_password_confirm: "secret3".to_string(),
    };
    let errors = form.validate().unwrap_err();
    assert!(errors.field_errors().contains_key("new_password_confirm"));
}

#[test]
fn test_module_and_project_payloads() {
    let root: CreateModuleRequest = serde_json::from_value(json!({ "name": "backend", "cn_name": "Backend" })).unwrap();
    assert_eq!(root.parent_id, 0);
    assert!(root.validate().is_ok());

    let project: ProjectRequest =
        serde_json::from_value(json!({ "name": "gateway", "cn_name": "Gateway", "module_id": 0 })).unwrap();
    assert!(project.validate().is_err());

    let patch = PatchProjectRequest {
        cn_name: Some(String::new()),
        ..PatchProjectRequest::default()
    };
    assert!(patch.validate().is_err());
    assert!(PatchProjectRequest::default().validate().is_ok());
}

#[test]
fn test_list_query_defaults() {
    let query = ListQuery::default();
    assert_eq!((query.page(), query.limit()), (1, 20));
}

#[test]
fn test_user_wire_shape() {
    let user: User = serde_json::from_value(json!({
        "id": 4,
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": "2024-01-01T00:00:00Z",
        "name": "alice",
        "cn_name": "Alice",
        "email": "alice@example.com",
        "admin": false,
        "enabled": true,
        "phone": "",
        "im": "",
    }))
    .unwrap();

    assert_eq!(user.base.id, 4);
    assert!(user.password.is_empty());
    assert!(user.token.is_none());

    let out = serde_json::to_value(user.into_public()).unwrap();
    assert_eq!(out["id"], 4);
    assert_eq!(out["roles"], json!(["user"]));
    assert!(out.get("password").is_none());
}
