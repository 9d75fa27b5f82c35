//! Command dispatch. Each command runs against a session resumed from disk.

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use cyberread_core::auth::FileSessionStore;
use cyberread_core::markdown;
use cyberread_core::models::{ArticleDraft, ArticleQuery, MediaUpload, PageQuery};
use cyberread_core::utils::pluralize;
use cyberread_core::{
    ActivitySignal, ApiClient, AuthError, Config, Gateway, ProfileUpdate, SessionManager,
};
use tracing::{debug, warn};

use crate::credentials::CredentialStore;
use crate::display;
use crate::{AdminCommand, Command, DraftArgs, Style};

/// Environment variables consulted before prompting
const EMAIL_ENV: &str = "CYBERREAD_EMAIL";
const PASSWORD_ENV: &str = "CYBERREAD_PASSWORD";

pub struct Context {
    config: Config,
    session: SessionManager,
    gateway: Gateway,
}

impl Context {
    pub fn new(config: Config) -> Result<Self> {
        let store = FileSessionStore::new(&config.data_dir()?);
        let api = ApiClient::from_config(&config)?;
        let session = SessionManager::new(api, Arc::new(store), config.session_settings());
        let gateway = Gateway::new(session.clone());
        Ok(Self {
            config,
            session,
            gateway,
        })
    }

    pub async fn run(&mut self, command: Command) -> Result<()> {
        let state = self.session.restore().await;
        debug!(authenticated = state.is_authenticated(), "Session resolved");
        self.session.record_activity(ActivitySignal::KeyPress);

        match command {
            Command::Login {
                email,
                remember,
                admin,
            } => self.login(email, remember, admin).await,
            Command::Register { username, email } => self.register(&username, &email).await,
            Command::Logout { forget } => self.logout(forget).await,
            Command::Whoami => {
                match self.session.current_user() {
                    Some(user) => display::identity(&user),
                    None => println!("Not logged in."),
                }
                Ok(())
            }
            Command::Status => {
                self.status();
                Ok(())
            }
            Command::Articles {
                category,
                tag,
                search,
                page,
                limit,
            } => {
                let query = ArticleQuery {
                    category,
                    tag,
                    search,
                    page,
                    limit,
                };
                let page = self.gateway.list_articles(&query).await?;
                display::article_page(&page);
                Ok(())
            }
            Command::Read { id } => self.read(&id).await,
            Command::Publish { fields } => self.publish(fields).await,
            Command::Edit {
                id,
                fields,
                append,
                style,
            } => self.edit(&id, fields, append, style).await,
            Command::Like { id } => {
                let article = self.gateway.like_article(&id).await?;
                println!(
                    "\"{}\" now has {}.",
                    article.title,
                    pluralize(article.like_count(), "like")
                );
                Ok(())
            }
            Command::Comment { id, text } => {
                let article = self.gateway.add_comment(&id, &text).await?;
                println!(
                    "Comment added. \"{}\" has {}.",
                    article.title,
                    pluralize(article.comments.len(), "comment")
                );
                Ok(())
            }
            Command::Uncomment { id, comment_id } => {
                self.gateway.delete_comment(&id, &comment_id).await?;
                println!("Comment deleted.");
                Ok(())
            }
            Command::Bookmarks => {
                let list = self.gateway.bookmarks().await?;
                display::articles(&list);
                Ok(())
            }
            Command::Bookmark { id } => {
                self.gateway.add_bookmark(&id).await?;
                println!("Bookmarked.");
                Ok(())
            }
            Command::Unbookmark { id } => {
                self.gateway.remove_bookmark(&id).await?;
                println!("Bookmark removed.");
                Ok(())
            }
            Command::Tip => {
                let tip = self.gateway.random_security_tip().await?;
                display::tip(&tip);
                Ok(())
            }
            Command::Profile {
                username,
                email,
                bio,
                avatar,
            } => {
                let update = ProfileUpdate {
                    username,
                    email,
                    bio,
                    profile_picture: avatar,
                };
                self.profile(update).await
            }
            Command::Passwd => self.change_password().await,
            Command::DeleteAccount { yes } => self.delete_account(yes).await,
            Command::Admin(admin) => self.admin(admin).await,
        }
    }

    /// Stop the expiry monitor and flush deferred activity.
    pub fn shutdown(&self) {
        self.session.shutdown();
    }

    // ===== Account =====

    async fn login(&mut self, email: Option<String>, remember: bool, admin: bool) -> Result<()> {
        let email = match email
            .or_else(|| std::env::var(EMAIL_ENV).ok().filter(|e| !e.is_empty()))
            .or_else(|| self.config.last_email.clone())
        {
            Some(email) => email,
            None => prompt_line("Email: ")?,
        };

        let remembered = CredentialStore::get_password(&email);
        let from_keychain = remembered.is_some();
        let password = match std::env::var(PASSWORD_ENV).ok().filter(|p| !p.is_empty()) {
            Some(password) => password,
            None => match remembered {
                Some(password) => password,
                None => rpassword::prompt_password("Password: ")?,
            },
        };

        let result = if admin {
            self.session.admin_login(&email, &password).await
        } else {
            self.session.authenticate(&email, &password).await
        };
        let user = match result {
            Ok(user) => user,
            Err(e @ AuthError::Authentication(_)) if from_keychain => {
                // The keychain entry is stale; don't keep retrying it
                if let Err(err) = CredentialStore::delete(&email) {
                    warn!(error = %err, "Failed to forget stale password");
                }
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        };

        if remember {
            if let Err(e) = CredentialStore::store(&email, &password) {
                warn!(error = %e, "Failed to store credentials");
            }
        }

        self.config.last_email = Some(email);
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }

        println!("Logged in as {}.", user.display_name());
        Ok(())
    }

    async fn register(&mut self, username: &str, email: &str) -> Result<()> {
        let password = match std::env::var(PASSWORD_ENV).ok().filter(|p| !p.is_empty()) {
            Some(password) => password,
            None => prompt_new_password()?,
        };

        let user = self.session.register(username, email, &password).await?;

        self.config.last_email = Some(user.email.clone());
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }

        println!("Welcome, {}! You are now logged in.", user.display_name());
        Ok(())
    }

    async fn logout(&self, forget: bool) -> Result<()> {
        let email = self
            .session
            .current_user()
            .map(|u| u.email)
            .or_else(|| self.config.last_email.clone());

        self.session.logout().await;

        if forget {
            if let Some(email) = email {
                CredentialStore::delete(&email)?;
            }
        }
        println!("Logged out.");
        Ok(())
    }

    fn status(&self) {
        println!("Backend: {}", self.session.api().base_url());
        match self.session.current_user() {
            Some(user) => {
                println!("Logged in as {} <{}>", user.display_name(), user.email);
                if let Some(minutes) = self.session.minutes_until_expiry() {
                    println!(
                        "Session ends after {} without activity.",
                        pluralize(minutes.max(0) as usize, "minute")
                    );
                }
                if CredentialStore::has_credentials(&user.email) {
                    println!("Password remembered in keychain.");
                }
            }
            None => println!("Not logged in."),
        }
    }

    async fn profile(&self, update: ProfileUpdate) -> Result<()> {
        if update.is_empty() {
            match self.session.current_user() {
                Some(user) => display::identity(&user),
                None => bail!(AuthError::not_logged_in()),
            }
            return Ok(());
        }

        let user = self.session.update_identity(update).await?;
        println!("Profile updated.");
        display::identity(&user);
        Ok(())
    }

    async fn change_password(&self) -> Result<()> {
        let Some(user) = self.session.current_user() else {
            bail!(AuthError::not_logged_in());
        };

        let current = rpassword::prompt_password("Current password: ")?;
        let new = prompt_new_password()?;
        self.session.change_password(&current, &new).await?;

        if CredentialStore::has_credentials(&user.email) {
            if let Err(e) = CredentialStore::store(&user.email, &new) {
                warn!(error = %e, "Failed to update remembered password");
            }
        }
        println!("Password changed.");
        Ok(())
    }

    async fn delete_account(&self, yes: bool) -> Result<()> {
        if !yes {
            bail!("This permanently deletes your account. Re-run with --yes to confirm.");
        }
        let email = self.session.current_user().map(|u| u.email);

        self.session.delete_account().await?;

        if let Some(email) = email {
            if let Err(e) = CredentialStore::delete(&email) {
                warn!(error = %e, "Failed to forget remembered password");
            }
        }
        println!("Account deleted.");
        Ok(())
    }

    // ===== Articles =====

    async fn read(&self, id: &str) -> Result<()> {
        let article = self.gateway.get_article(id).await?;
        let viewer = self.session.current_user();
        display::article(&article, viewer.as_ref());

        if viewer.is_some() && self.gateway.is_bookmarked(id).await? {
            println!("(bookmarked)");
        }
        Ok(())
    }

    async fn publish(&self, fields: DraftArgs) -> Result<()> {
        if fields.file.is_none() {
            bail!("Give the article content with --file PATH (or --file - for stdin)");
        }
        let mut draft = ArticleDraft::new(String::new(), String::new());
        apply_fields(&mut draft, fields)?;

        let article = self.gateway.create_article(&draft).await?;
        println!("Published \"{}\" ({}).", article.title, article.id);
        Ok(())
    }

    async fn edit(
        &self,
        id: &str,
        fields: DraftArgs,
        append: Option<String>,
        style: Option<Style>,
    ) -> Result<()> {
        let current = self.gateway.get_article(id).await?;
        let mut draft = ArticleDraft::from_article(&current);
        apply_fields(&mut draft, fields)?;
        if let Some(text) = append {
            draft.content = append_snippet(&draft.content, &text, style);
        }

        let article = self.gateway.update_article(id, &draft).await?;
        println!("Updated \"{}\".", article.title);
        Ok(())
    }

    // ===== Admin =====

    async fn admin(&self, command: AdminCommand) -> Result<()> {
        match command {
            AdminCommand::Stats => {
                let (stats, users, articles) = futures::try_join!(
                    self.gateway.admin_stats(),
                    self.gateway.list_users(PageQuery::default()),
                    self.gateway.list_admin_articles(PageQuery::default()),
                )?;
                display::stats(&stats);
                println!("\nRecent users:");
                display::users(&users);
                println!("\nRecent articles:");
                display::articles(&articles.articles);
            }
            AdminCommand::Users { page, limit } => {
                let users = self.gateway.list_users(PageQuery { page, limit }).await?;
                display::users(&users);
            }
            AdminCommand::Freeze { id } => {
                self.gateway.freeze_user(&id).await?;
                println!("User {} frozen.", id);
            }
            AdminCommand::Unfreeze { id } => {
                self.gateway.unfreeze_user(&id).await?;
                println!("User {} unfrozen.", id);
            }
            AdminCommand::DeleteUser { id } => {
                self.gateway.delete_user(&id).await?;
                println!("User {} deleted.", id);
            }
            AdminCommand::DeleteArticle { id } => {
                self.gateway.delete_article(&id).await?;
                println!("Article {} deleted.", id);
            }
        }
        Ok(())
    }
}

/// Overlay the fields given on the command line onto `draft`.
fn apply_fields(draft: &mut ArticleDraft, fields: DraftArgs) -> Result<()> {
    if let Some(title) = fields.title {
        draft.title = title;
    }
    if let Some(path) = fields.file {
        draft.content = read_content(&path)?;
    }
    if let Some(category) = fields.category {
        draft.category = category;
    }
    if let Some(tags) = fields.tags {
        draft.tags = ArticleDraft::parse_tags(&tags);
    }
    if let Some(minutes) = fields.read_time {
        draft.read_time = minutes;
    }
    if let Some(path) = fields.media {
        let bytes =
            fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        draft.media = Some(MediaUpload { file_name, bytes });
    }
    if fields.image_url.is_some() {
        draft.image_url = fields.image_url;
    }
    if fields.video_url.is_some() {
        draft.video_url = fields.video_url;
    }
    Ok(())
}

fn read_content(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut content = String::new();
        io::stdin()
            .read_to_string(&mut content)
            .context("Failed to read content from stdin")?;
        return Ok(content);
    }
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Append `text` as a new paragraph, styled the way the editor toolbar would.
fn append_snippet(content: &str, text: &str, style: Option<Style>) -> String {
    let snippet = match style {
        Some(style) => markdown::apply(text, 0..text.len(), style.into(), true).text,
        None => text.to_string(),
    };
    let content = content.trim_end();
    if content.is_empty() {
        snippet
    } else {
        format!("{}\n\n{}", content, snippet)
    }
}

fn prompt_line(prompt: &str) -> Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn prompt_new_password() -> Result<String> {
    let password = rpassword::prompt_password("New password: ")?;
    let confirm = rpassword::prompt_password("Confirm password: ")?;
    if password != confirm {
        bail!("Passwords do not match");
    }
    Ok(password)
}
