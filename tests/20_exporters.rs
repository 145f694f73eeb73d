mod common;

use anyhow::Result;
use reqwest::StatusCode;

const TENANT: &str = "team-a";

const CLOUDWATCH: &str = "\
name: cw
type: cloudwatch
credential: aws-prod
config:
  region: us-west-2
  namespaces:
    - AWS/EC2
    - AWS/RDS
  period: 60
";

#[tokio::test]
async fn config_is_expanded_on_read() -> Result<()> {
    let server = common::start_server().await?;

    let res = server.post(TENANT, "/api/v1/exporters", CLOUDWATCH).await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = server.get(TENANT, "/api/v1/exporters/cw/").await?;
    assert_eq!(res.status(), StatusCode::OK);
    let docs = common::documents(&res.text().await?)?;
    let cw = &docs[0];
    assert_eq!(cw["type"].as_str(), Some("cloudwatch"));
    assert_eq!(cw["credential"].as_str(), Some("aws-prod"));
    assert_eq!(cw["config"]["region"].as_str(), Some("us-west-2"));
    assert_eq!(cw["config"]["namespaces"][1].as_str(), Some("AWS/RDS"));
    assert_eq!(cw["config"]["period"].as_i64(), Some(60));

    Ok(())
}

#[tokio::test]
async fn update_replaces_config_and_reference() -> Result<()> {
    let server = common::start_server().await?;
    server.post(TENANT, "/api/v1/exporters", CLOUDWATCH).await?;

    let update = "name: cw\nconfig:\n  region: eu-central-1\n";
    let res = server.post(TENANT, "/api/v1/exporters", update).await?;
    assert_eq!(res.status(), StatusCode::OK);
    let summary = common::documents(&res.text().await?)?;
    assert_eq!(summary[0]["updated"][0].as_str(), Some("cw"));

    let res = server.get(TENANT, "/api/v1/exporters").await?;
    let docs = common::documents(&res.text().await?)?;
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0]["config"]["region"].as_str(), Some("eu-central-1"));
    assert!(docs[0]["config"].get("namespaces").is_none());
    // reference dropped by the update
    assert!(docs[0].get("credential").is_none());

    Ok(())
}

#[tokio::test]
async fn config_shape_is_validated() -> Result<()> {
    let server = common::start_server().await?;

    let cases = [
        (
            "name: cw\ntype: cloudwatch\nconfig: [a, b]\n",
            "exporter 'cw' config is invalid (must be YAML map)",
        ),
        (
            "name: cw\ntype: cloudwatch\nconfig:\n  labels:\n    1: one\n",
            "exporter 'cw' config could not be encoded as JSON",
        ),
        ("name: cw\nconfig: {a: 1}\n", "exporter 'cw' is missing a type"),
        ("name: cw\ntype: cloudwatch\n", "Decoding exporter input at index=0 failed"),
    ];
    for (body, expected) in cases {
        let res = server.post(TENANT, "/api/v1/exporters", body).await?;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "body {:?}", body);
        let text = res.text().await?;
        assert!(text.starts_with(expected), "body {:?} gave {:?}", body, text);
    }

    let res = server.get(TENANT, "/api/v1/exporters").await?;
    assert!(common::documents(&res.text().await?)?.is_empty());

    Ok(())
}

#[tokio::test]
async fn type_change_is_refused() -> Result<()> {
    let server = common::start_server().await?;
    server.post(TENANT, "/api/v1/exporters", CLOUDWATCH).await?;

    let change = "name: cw\ntype: stackdriver\nconfig: {project: demo}\n";
    let res = server.post(TENANT, "/api/v1/exporters", change).await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        res.text().await?,
        "exporter 'cw' type cannot be updated (current=cloudwatch, updated=stackdriver)\n"
    );

    Ok(())
}

#[tokio::test]
async fn delete_then_get_is_not_found() -> Result<()> {
    let server = common::start_server().await?;
    server.post(TENANT, "/api/v1/exporters", CLOUDWATCH).await?;

    let res = server.delete(TENANT, "/api/v1/exporters/cw").await?;
    assert_eq!(res.status(), StatusCode::OK);
    let docs = common::documents(&res.text().await?)?;
    assert_eq!(docs[0]["config"]["region"].as_str(), Some("us-west-2"));

    let res = server.get(TENANT, "/api/v1/exporters/cw").await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn multiple_tenant_values_are_invalid() -> Result<()> {
    let server = common::start_server().await?;

    let res = server
        .client()
        .get(server.url("/api/v1/exporters"))
        .header(common::TENANT_HEADER, "team-a")
        .header(common::TENANT_HEADER, "team-b")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        res.text().await?,
        "invalid tenant ID in request to /api/v1/exporters\n"
    );

    Ok(())
}
