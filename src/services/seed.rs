//! Demonstration data loaded at start-up

use chrono::Duration;

use crate::{
    error::AppResult,
    models::{
        book::BookFields,
        user::{CreateUser, Role},
    },
};

use super::Services;

const USERS: [(&str, &str, &str, Role); 3] = [
    ("admin", "admin@example.com", "admin123", Role::Admin),
    ("librarian", "librarian@example.com", "librarian123", Role::Librarian),
    ("reader", "reader@example.com", "reader123", Role::Reader),
];

fn sample_books() -> Vec<BookFields> {
    let book = |title: &str,
                author: &str,
                isbn: &str,
                published_year: i32,
                category: &str,
                description: &str,
                cover: &str,
                quantity: i32| BookFields {
        title: title.to_string(),
        author: author.to_string(),
        isbn: isbn.to_string(),
        published_year,
        category: category.to_string(),
        description: description.to_string(),
        cover_url: format!("https://img.example.org/covers/{}.jpg", cover),
        quantity,
    };

    vec![
        book(
            "Python Crash Course",
            "Eric Matthes",
            "9787115428028",
            2016,
            "Programming",
            "A hands-on, project-based introduction to programming in Python.",
            "python-crash-course",
            5,
        ),
        book(
            "Go in Action",
            "William Kennedy",
            "9787115445353",
            2017,
            "Programming",
            "Idiomatic Go, its concurrency model, testing and web programming.",
            "go-in-action",
            3,
        ),
        book(
            "Those Things of the Ming Dynasty",
            "Dangnian Mingyue",
            "9787807023630",
            2009,
            "History",
            "Three centuries of Ming history, from 1344 to 1644, told as a novel.",
            "ming-dynasty",
            4,
        ),
        book(
            "The Three-Body Problem",
            "Liu Cixin",
            "9787536692930",
            2008,
            "Science Fiction",
            "A secret military project sends a signal into space and changes humanity's fate.",
            "three-body",
            2,
        ),
        book(
            "Fortress Besieged",
            "Qian Zhongshu",
            "9787020090006",
            1991,
            "Literature",
            "A satirical novel about marriage and the intellectual class in 1930s China.",
            "fortress-besieged",
            3,
        ),
    ]
}

/// Populate empty collections with sample users, books and loans.
/// Does nothing when users already exist.
pub async fn load_sample_data(services: &Services) -> AppResult<()> {
    if services.users.count().await > 0 {
        tracing::info!("Sample data skipped: users already present");
        return Ok(());
    }

    let mut user_ids = Vec::with_capacity(USERS.len());
    for (username, email, password, role) in USERS {
        let user = services
            .users
            .register(CreateUser {
                username: username.to_string(),
                email: email.to_string(),
                password: password.to_string(),
                role,
            })
            .await?;
        user_ids.push(user.id);
    }

    let mut book_ids = Vec::new();
    for fields in sample_books() {
        book_ids.push(services.catalog.create(fields).await?.id);
    }

    let now = services.loans.now();
    let one_week_ago = now - Duration::days(7);
    let two_weeks_ago = now - Duration::days(14);

    // admin: borrowed two weeks ago, returned on the due date
    let returned = services
        .loans
        .create(user_ids[0], book_ids[0], two_weeks_ago, now)
        .await?;
    services.loans.return_loan(returned.id).await?;
    // librarian: current loan due in a week
    services
        .loans
        .create(user_ids[1], book_ids[1], one_week_ago, now + Duration::days(7))
        .await?;
    // reader: one current loan and one due yesterday
    services
        .loans
        .create(user_ids[2], book_ids[2], one_week_ago, now + Duration::days(14))
        .await?;
    services
        .loans
        .create(user_ids[2], book_ids[3], two_weeks_ago, now - Duration::days(1))
        .await?;

    tracing::info!(
        "Sample data loaded: {} users, {} books, {} loans",
        user_ids.len(),
        book_ids.len(),
        services.loans.count().await
    );
    Ok(())
}
