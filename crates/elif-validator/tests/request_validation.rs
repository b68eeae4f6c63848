//! End-to-end validation of request-shaped records

use elif_validator::{
    body, check, cookie, header, param, query, Absence, ArrayOptions, ConfigurationError,
    EmailOptions, ErrorPolicy, Executor, FailureKind, IntOptions, LengthOptions, Location,
    Record, RunError, UrlOptions,
};
use serde_json::json;
use std::collections::HashMap;

fn strings(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn request() -> Record {
    Record::from_parts(
        json!({
            "name": "  Ada Lovelace ",
            "email": "ada@example.com",
            "website": "example.com",
            "tags": ["math", "engines"],
            "addresses": [
                { "city": "London", "zip": "N1 9GU" },
                { "city": "" }
            ]
        }),
        strings(&[("page", "2"), ("per_page", "500")]),
        strings(&[("id", "42")]),
        strings(&[("Content-Type", "application/json"), ("X-Trace", "abc")]),
        strings(&[("session", "s3cr3t")]),
    )
}

#[tokio::test]
async fn test_full_request() {
    let chains = vec![
        body("name")
            .trim(None)
            .is_length(LengthOptions::range(2, 50))
            .build()
            .unwrap(),
        body("email").is_email(EmailOptions::default()).build().unwrap(),
        body("website")
            .is_url(UrlOptions::default().require_protocol(true))
            .with_message("Website must include http:// or https://")
            .build()
            .unwrap(),
        body("tags").is_array(ArrayOptions::range(1, 5)).build().unwrap(),
        body("addresses.*.city")
            .not_empty(Default::default())
            .with_message("City is required")
            .build()
            .unwrap(),
        query("page").is_int(IntOptions::new().min(1)).to_int(None).build().unwrap(),
        query("per_page")
            .is_int(IntOptions::new().range(1, 100))
            .build()
            .unwrap(),
        param("id").is_int(IntOptions::default()).build().unwrap(),
        header("content-type").is_mime_type().build().unwrap(),
        cookie("session").is_length(LengthOptions::min(4)).build().unwrap(),
    ];

    let report = Executor::default().run(&chains, request()).await.unwrap();

    let failed: Vec<(Location, &str)> = report
        .errors()
        .iter()
        .map(|e| (e.location, e.path.as_str()))
        .collect();
    assert_eq!(
        failed,
        vec![
            (Location::Body, "website"),
            (Location::Body, "addresses[1].city"),
            (Location::Query, "per_page"),
        ]
    );
    assert_eq!(
        report.mapped()["body.website"].message,
        "Website must include http:// or https://"
    );

    let data = report.matched_data();
    assert_eq!(data["name"], json!("Ada Lovelace"));
    assert_eq!(data["page"], json!(2));
    assert_eq!(data["content-type"], json!("application/json"));
}

#[tokio::test]
async fn test_check_searches_every_location() {
    let chain = check("id").is_int(IntOptions::default()).build().unwrap();
    let result = chain.run(request()).await.unwrap();

    assert!(!result.has_errors());
    assert_eq!(result.values().len(), 1);
    assert_eq!(result.values()[0].location, Location::Params);
}

#[tokio::test]
async fn test_optional_query_parameter() {
    let chain = query("sort")
        .optional(Absence::Falsy)
        .is_in(["asc", "desc"])
        .build()
        .unwrap();

    let result = chain.run(request()).await.unwrap();
    assert!(!result.has_errors());
    assert!(result.values().is_empty());
}

#[tokio::test]
async fn test_cross_field_custom_validator() {
    let chain = body("password_confirmation")
        .custom(|value, meta| value == meta.record().body().get("password"))
        .with_message("Passwords must match")
        .build()
        .unwrap();

    let record = Record::new().with_body(json!({
        "password": "hunter22",
        "password_confirmation": "hunter2"
    }));
    let result = chain.run(record).await.unwrap();
    assert_eq!(result.errors()[0].message, "Passwords must match");
}

#[tokio::test]
async fn test_absorbed_and_propagated_errors() {
    let absorbed = body("coupon")
        .custom_async(|_, _| async { Err::<bool, _>("coupon service timed out") })
        .build()
        .unwrap();
    let report = Executor::default()
        .run(&[absorbed], Record::new().with_body(json!({ "coupon": "X1" })))
        .await
        .unwrap();
    assert_eq!(report.errors()[0].kind, FailureKind::Errored);
    assert_eq!(report.errors()[0].message, "coupon service timed out");

    let propagated = body("coupon")
        .on_error(ErrorPolicy::Propagate)
        .custom_async(|_, _| async { Err::<bool, _>("coupon service timed out") })
        .build()
        .unwrap();
    let result = Executor::default()
        .run(&[propagated], Record::new().with_body(json!({ "coupon": "X1" })))
        .await;
    assert!(matches!(result, Err(RunError::Unexpected { .. })));
}

#[test]
fn test_configuration_errors_surface_at_build() {
    assert!(matches!(
        body("users[").is_email(Default::default()).build(),
        Err(ConfigurationError::MalformedLocator { .. })
    ));
    assert!(matches!(
        body("name").with_message("orphan").build(),
        Err(ConfigurationError::MessageWithoutValidator)
    ));
    assert!(matches!(
        body("name").add_standard_validation("isMagic", vec![]).build(),
        Err(ConfigurationError::UnknownRule { .. })
    ));
    assert!(matches!(
        body("name").matches("([", None).build(),
        Err(ConfigurationError::InvalidArguments { .. })
    ));
}

#[tokio::test]
async fn test_report_json_shape() {
    let chain = body("email").is_email(Default::default()).build().unwrap();
    let report = Executor::default()
        .run(&[chain], Record::new().with_body(json!({ "email": "nope" })))
        .await
        .unwrap();

    assert_eq!(
        report.to_json(),
        json!({
            "error": {
                "code": "validation_failed",
                "message": "Validation failed",
                "fields": {
                    "body.email": [{
                        "location": "body",
                        "path": "email",
                        "value": "nope",
                        "message": "Invalid value",
                        "rule": "isEmail",
                        "kind": "invalid"
                    }]
                }
            }
        })
    );
}
