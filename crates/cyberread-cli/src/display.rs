//! Plain-text rendering for terminal output.

use cyberread_core::models::{AdminStats, Article, ArticlePage, SecurityTip, UserPage};
use cyberread_core::utils::{format_optional, pluralize, truncate_string};
use cyberread_core::Identity;

/// Column width for titles in listings
const TITLE_WIDTH: usize = 48;

pub fn identity(user: &Identity) {
    println!("{} <{}>", user.display_name(), user.email);
    if user.is_admin {
        println!("  role:    admin");
    }
    println!("  id:      {}", user.id);
    println!("  bio:     {}", format_optional(&user.bio, "-"));
    println!("  avatar:  {}", format_optional(&user.profile_picture, "-"));
}

pub fn article_row(article: &Article) {
    println!(
        "{:<24}  {:<width$}  {:<12}  {}",
        article.id,
        truncate_string(&article.title, TITLE_WIDTH),
        truncate_string(&article.author.username, 12),
        pluralize(article.like_count(), "like"),
        width = TITLE_WIDTH,
    );
}

pub fn articles(list: &[Article]) {
    if list.is_empty() {
        println!("No articles.");
        return;
    }
    for article in list {
        article_row(article);
    }
}

pub fn article_page(page: &ArticlePage) {
    articles(&page.articles);
    println!(
        "\nPage {} of {} ({})",
        page.current_page.max(1),
        page.total_pages.max(1),
        pluralize(page.total as usize, "article")
    );
}

pub fn article(article: &Article, viewer: Option<&Identity>) {
    println!("{}", article.title);
    println!(
        "by {} · {} · {}",
        article.author.username,
        article.published(),
        if article.category.is_empty() {
            "uncategorized"
        } else {
            article.category.as_str()
        }
    );
    if !article.tags.is_empty() {
        println!("tags: {}", article.tags.join(", "));
    }
    let liked = viewer
        .map(|user| article.is_liked_by(&user.id))
        .unwrap_or(false);
    println!(
        "{}{} · {}",
        pluralize(article.like_count(), "like"),
        if liked { " (you)" } else { "" },
        pluralize(article.views as usize, "view")
    );
    println!("\n{}\n", article.content);

    if article.comments.is_empty() {
        return;
    }
    println!("{}:", pluralize(article.comments.len(), "comment"));
    for comment in &article.comments {
        println!("  [{}] {}: {}", comment.id, comment.user.username, comment.content);
    }
}

pub fn tip(tip: &SecurityTip) {
    if tip.category.is_empty() {
        println!("Tip: {}", tip.content);
    } else {
        println!("Tip ({}): {}", tip.category, tip.content);
    }
}

pub fn stats(stats: &AdminStats) {
    println!("Users:     {}", stats.total_users);
    println!("Articles:  {}", stats.total_articles);
    println!("Bookmarks: {}", stats.total_bookmarks);
    println!("Comments:  {}", stats.total_comments);
}

pub fn users(page: &UserPage) {
    for user in &page.users {
        println!(
            "{:<24}  {:<16}  {:<32}  {}",
            user.id,
            truncate_string(&user.username, 16),
            truncate_string(&user.email, 32),
            if user.is_frozen { "frozen" } else { "active" }
        );
    }
    println!(
        "\nPage {} of {} ({})",
        page.current_page.max(1),
        page.total_pages.max(1),
        pluralize(page.total as usize, "user")
    );
}
