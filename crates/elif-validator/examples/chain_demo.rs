//! Validation chain demo: building chains, running them, reading the report

use elif_validator::{
    body, check, header, query, Absence, EmptyOptions, ErrorPolicy, Executor, ExistsOptions,
    IntOptions, LengthOptions, Message, Record, ValidatorConfig,
};
use serde_json::json;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("elif_validator=debug")
        .init();

    println!("🦀 elif-validator Demo");
    println!("======================\n");

    demo_signup().await?;
    demo_wildcards().await?;
    demo_custom_validators().await?;

    println!("✅ All validation demos completed successfully!");
    Ok(())
}

async fn demo_signup() -> Result<(), Box<dyn std::error::Error>> {
    println!("📝 Demo 1: Signup form");
    println!("----------------------");

    let chains = vec![
        body("email")
            .trim(None)
            .is_email(Default::default())
            .with_message("Must be a valid email address")
            .build()?,
        body("password")
            .is_length(LengthOptions::min(8))
            .with_message("Password must be at least 8 characters")
            .not()
            .contains("password")
            .with_message("Password is too easy to guess")
            .build()?,
        body("age")
            .optional(Absence::NullOrUndefined)
            .is_int(IntOptions::new().min(13).max(120))
            .to_int(None)
            .build()?,
        header("X-Request-Id")
            .optional(Absence::UndefinedOnly)
            .is_uuid(Some("4"))
            .build()?,
        query("ref").optional(Absence::Falsy).is_slug().build()?,
    ];

    let mut record = Record::new()
        .with_body(json!({
            "email": "  jane@example.com ",
            "password": "mypassword1",
            "age": "29"
        }))
        .with_query(json!({ "ref": "Spring Sale" }));
    record.insert_header("X-Request-Id", "not-a-uuid");

    let report = Executor::default().run(&chains, record).await?;

    println!("{}", report);
    println!("\nSanitized data:");
    for (path, value) in report.matched_data() {
        println!("  {} = {}", path, value);
    }
    println!("\nAs JSON:\n{}\n", serde_json::to_string_pretty(&report.to_json())?);
    Ok(())
}

async fn demo_wildcards() -> Result<(), Box<dyn std::error::Error>> {
    println!("📝 Demo 2: Wildcards");
    println!("--------------------");

    let chains = vec![
        body("items")
            .is_array(elif_validator::ArrayOptions::min(1))
            .with_message("At least one item is required")
            .build()?,
        body("items.*.sku")
            .exists(ExistsOptions::falsy())
            .bail()
            .is_length(LengthOptions::range(4, 12))
            .build()?,
        body("items.*.quantity")
            .is_int(IntOptions::new().gt(0))
            .with_message(Message::dynamic(|value, meta| {
                let shown = value.map_or_else(|| "nothing".to_string(), |v| v.to_string());
                format!("{} is not a valid quantity for {}", shown, meta.path())
            }))
            .build()?,
    ];

    let record = Record::new().with_body(json!({
        "items": [
            { "sku": "ABC-123", "quantity": 2 },
            { "sku": "", "quantity": 0 },
            { "sku": "X", "quantity": "many" }
        ]
    }));

    let report = Executor::default().run(&chains, record).await?;
    for (field, error) in report.mapped() {
        println!("  ❌ {}: {}", field, error.message);
    }
    println!();
    Ok(())
}

async fn demo_custom_validators() -> Result<(), Box<dyn std::error::Error>> {
    println!("📝 Demo 3: Custom validators and conditions");
    println!("-------------------------------------------");

    let taken = ["admin", "root"];
    let chains = vec![
        check("username")
            .not_empty(EmptyOptions::default())
            .custom_async(move |value, _| async move {
                let name = value.and_then(|v| v.as_str().map(str::to_string)).unwrap_or_default();
                !taken.contains(&name.as_str())
            })
            .with_message("Username is already taken")
            .build()?,
        body("password_confirmation")
            .when_chain(body("password").exists(Default::default()).build()?)
            .custom(|value, meta| value == meta.record().body().get("password"))
            .with_message("Passwords do not match")
            .build()?,
        body("invite_code")
            .on_error(ErrorPolicy::Absorb)
            .custom(|_, _| Err::<bool, _>("invite service unavailable"))
            .build()?,
    ];

    let record = Record::new().with_body(json!({
        "username": "admin",
        "password": "correct horse",
        "password_confirmation": "battery staple",
        "invite_code": "XYZ"
    }));

    let config = ValidatorConfig::from_env()?;
    let report = Executor::new(config).run(&chains, record).await?;
    for error in report.errors() {
        println!("  ❌ {} ({:?}): {}", error.path, error.kind, error.message);
    }
    println!();
    Ok(())
}
