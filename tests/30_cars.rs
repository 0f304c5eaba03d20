mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

/// A subject id no other test run has used, so listing assertions are
/// not polluted by leftovers in a shared database.
fn unique_subject(tag: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock before epoch")
        .as_nanos();
    format!("{}-{}", tag, nanos)
}

async fn create_car(
    client: &reqwest::Client,
    base: &str,
    token: &str,
    make: &str,
) -> Result<Value> {
    let res = client
        .post(format!("{}/cars", base))
        .bearer_auth(token)
        .json(&json!({ "make": make, "model": "Kei", "color": "white" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    Ok(res.json().await?)
}

async fn create_garage(client: &reqwest::Client, base: &str, name: &str) -> Result<Value> {
    let res = client
        .post(format!("{}/garages", base))
        .json(&json!({ "name": name, "city": "Bend", "state": "OR" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    Ok(res.json().await?)
}

#[tokio::test]
async fn car_lifecycle_through_garage_assignment() -> Result<()> {
    if !common::integration_env_ready() {
        eprintln!("skipping: DATABASE_URL not set");
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let subject = unique_subject("lifecycle");
    let token = common::mint_id_token(&subject, "Lifecycle Tester");

    // Create: owned by the token's subject, not yet garaged
    let car = create_car(&client, &server.base_url, &token, "Honda").await?;
    let car_id = car["id"].as_i64().expect("integer id");
    let car_url = car["self"].as_str().expect("self link").to_string();
    assert!(car_url.ends_with(&format!("/cars/{}", car_id)));
    assert_eq!(car["owner"]["user_id"], json!(subject));
    assert!(car["garage"].is_null());

    let garage = create_garage(&client, &server.base_url, "Lifecycle").await?;
    let garage_id = garage["id"].as_i64().expect("integer id");
    let garage_url = garage["self"].as_str().expect("self link").to_string();

    // Assign, then confirm both sides of the relationship
    let rel_url = format!("{}/cars/{}/garages/{}", server.base_url, car_id, garage_id);
    let res = client.put(&rel_url).bearer_auth(&token).send().await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let fetched = client
        .get(&car_url)
        .bearer_auth(&token)
        .send()
        .await?
        .json::<Value>()
        .await?;
    assert_eq!(fetched["garage"]["id"], json!(garage_id));
    assert_eq!(fetched["garage"]["self"], json!(garage_url));

    let fetched = client.get(&garage_url).send().await?.json::<Value>().await?;
    let housed = fetched["cars"].as_array().expect("cars array");
    assert!(housed.iter().any(|c| c["id"] == json!(car_id)));

    // A garaged car cannot be deleted
    let res = client.delete(&car_url).bearer_auth(&token).send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = res.json::<Value>().await?;
    assert_eq!(body["Error"], "Cannot delete a car that is in a garage");

    // Remove the relationship; both sides forget each other
    let res = client.delete(&rel_url).bearer_auth(&token).send().await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let fetched = client.get(&garage_url).send().await?.json::<Value>().await?;
    let housed = fetched["cars"].as_array().expect("cars array");
    assert!(!housed.iter().any(|c| c["id"] == json!(car_id)));

    let fetched = client
        .get(&car_url)
        .bearer_auth(&token)
        .send()
        .await?
        .json::<Value>()
        .await?;
    assert!(fetched["garage"].is_null());

    // Now the delete goes through
    let res = client.delete(&car_url).bearer_auth(&token).send().await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    let res = client.get(&car_url).bearer_auth(&token).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    client.delete(&garage_url).send().await?;
    Ok(())
}

#[tokio::test]
async fn listing_never_shows_another_subjects_cars() -> Result<()> {
    if !common::integration_env_ready() {
        eprintln!("skipping: DATABASE_URL not set");
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let alice = unique_subject("alice");
    let bob = unique_subject("bob");
    let alice_token = common::mint_id_token(&alice, "Alice");
    let bob_token = common::mint_id_token(&bob, "Bob");

    let mine_a = create_car(&client, &server.base_url, &alice_token, "Toyota").await?;
    let mine_b = create_car(&client, &server.base_url, &alice_token, "Subaru").await?;
    let theirs = create_car(&client, &server.base_url, &bob_token, "Mazda").await?;
    let theirs_id = theirs["id"].as_i64().unwrap();

    // Walk every page of the listing as one subject
    let mut seen = Vec::new();
    let mut next = format!("{}/cars", server.base_url);
    loop {
        let res = client.get(&next).bearer_auth(&alice_token).send().await?;
        assert_eq!(res.status(), StatusCode::OK);
        let page = res.json::<Value>().await?;
        for car in page["cars"].as_array().expect("cars array") {
            assert_eq!(car["owner"]["user_id"], json!(alice));
            seen.push(car["id"].as_i64().unwrap());
        }
        match page["next"].as_str() {
            Some("No more results") => break,
            Some(url) => next = url.to_string(),
            None => panic!("next must be a string"),
        }
    }
    assert!(seen.contains(&mine_a["id"].as_i64().unwrap()));
    assert!(seen.contains(&mine_b["id"].as_i64().unwrap()));
    assert!(!seen.contains(&theirs_id));

    // Fetching the other subject's car by id is indistinguishable from
    // a missing car
    let res = client
        .get(format!("{}/cars/{}", server.base_url, theirs_id))
        .bearer_auth(&alice_token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    for car in [&mine_a, &mine_b] {
        client
            .delete(car["self"].as_str().unwrap())
            .bearer_auth(&alice_token)
            .send()
            .await?;
    }
    client
        .delete(theirs["self"].as_str().unwrap())
        .bearer_auth(&bob_token)
        .send()
        .await?;
    Ok(())
}

#[tokio::test]
async fn six_cars_paginate_as_five_then_one() -> Result<()> {
    if !common::integration_env_ready() {
        eprintln!("skipping: DATABASE_URL not set");
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let subject = unique_subject("pager");
    let token = common::mint_id_token(&subject, "Pager");

    let mut created_urls = Vec::new();
    for n in 0..6 {
        let car = create_car(&client, &server.base_url, &token, &format!("Make{}", n)).await?;
        created_urls.push(car["self"].as_str().unwrap().to_string());
    }

    // Page one: exactly five cars and a next URL
    let res = client
        .get(format!("{}/cars", server.base_url))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let page = res.json::<Value>().await?;
    assert_eq!(page["results"], json!(5));
    assert_eq!(page["cars"].as_array().unwrap().len(), 5);
    let next = page["next"].as_str().expect("next url");
    assert!(next.contains("/cars/page/"), "unexpected next: {}", next);

    // Page two: the remaining car and the terminal marker
    let res = client.get(next).bearer_auth(&token).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let page = res.json::<Value>().await?;
    assert_eq!(page["results"], json!(1));
    assert_eq!(page["next"], "No more results");

    for url in &created_urls {
        client.delete(url).bearer_auth(&token).send().await?;
    }
    Ok(())
}

#[tokio::test]
async fn assigning_a_foreign_car_is_forbidden() -> Result<()> {
    if !common::integration_env_ready() {
        eprintln!("skipping: DATABASE_URL not set");
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let owner_token = common::mint_id_token(&unique_subject("owner"), "Owner");
    let intruder_token = common::mint_id_token(&unique_subject("intruder"), "Intruder");

    let car = create_car(&client, &server.base_url, &owner_token, "Volvo").await?;
    let garage = create_garage(&client, &server.base_url, "Foreign").await?;
    let rel_url = format!(
        "{}/cars/{}/garages/{}",
        server.base_url,
        car["id"].as_i64().unwrap(),
        garage["id"].as_i64().unwrap()
    );

    let res = client.put(&rel_url).bearer_auth(&intruder_token).send().await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body = res.json::<Value>().await?;
    assert_eq!(body["Error"], "This car does not belong to the authenticated user");

    client
        .delete(car["self"].as_str().unwrap())
        .bearer_auth(&owner_token)
        .send()
        .await?;
    client.delete(garage["self"].as_str().unwrap()).send().await?;
    Ok(())
}

#[tokio::test]
async fn concurrent_assigns_settle_on_one_garage() -> Result<()> {
    if !common::integration_env_ready() {
        eprintln!("skipping: DATABASE_URL not set");
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let subject = unique_subject("racer");
    let token = common::mint_id_token(&subject, "Racer");

    let car = create_car(&client, &server.base_url, &token, "Lotus").await?;
    let car_id = car["id"].as_i64().unwrap();
    let g1 = create_garage(&client, &server.base_url, "RaceA").await?;
    let g2 = create_garage(&client, &server.base_url, "RaceB").await?;
    let g1_id = g1["id"].as_i64().unwrap();
    let g2_id = g2["id"].as_i64().unwrap();

    // Race the same car into two garages; the row locks must let
    // exactly one assignment commit and report the other as a conflict.
    let url_a = format!("{}/cars/{}/garages/{}", server.base_url, car_id, g1_id);
    let url_b = format!("{}/cars/{}/garages/{}", server.base_url, car_id, g2_id);
    let (res_a, res_b) = tokio::join!(
        client.put(&url_a).bearer_auth(&token).send(),
        client.put(&url_b).bearer_auth(&token).send(),
    );
    let mut statuses = vec![res_a?.status(), res_b?.status()];
    statuses.sort();
    assert_eq!(statuses, vec![StatusCode::NO_CONTENT, StatusCode::BAD_REQUEST]);

    // The car sits in exactly one of the two, and that garage agrees
    let fetched = client
        .get(car["self"].as_str().unwrap())
        .bearer_auth(&token)
        .send()
        .await?
        .json::<Value>()
        .await?;
    let winner = fetched["garage"]["id"].as_i64().expect("a garage won");
    assert!(winner == g1_id || winner == g2_id);
    let loser_url = if winner == g1_id {
        g2["self"].as_str().unwrap()
    } else {
        g1["self"].as_str().unwrap()
    };
    let loser = client.get(loser_url).send().await?.json::<Value>().await?;
    assert!(loser["cars"].as_array().unwrap().is_empty());

    let rel = format!("{}/cars/{}/garages/{}", server.base_url, car_id, winner);
    client.delete(&rel).bearer_auth(&token).send().await?;
    client
        .delete(car["self"].as_str().unwrap())
        .bearer_auth(&token)
        .send()
        .await?;
    client.delete(g1["self"].as_str().unwrap()).send().await?;
    client.delete(g2["self"].as_str().unwrap()).send().await?;
    Ok(())
}
