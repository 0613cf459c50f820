use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use safedocs_client::api::ThumbnailSize;
use safedocs_client::cache::{FolderCache, DEFAULT_FOLDER_TTL};
use safedocs_client::config::{self, Command, Config, DocCommand, FolderCommand, ShareCommand};
use safedocs_client::models::{
    CreateDocumentRequest, CreateFolderRequest, CreateShareRequest, DocumentSearch, Folder,
};
use safedocs_client::{
    AuthService, FilePart, SessionClient, SessionEvent, SessionManager, SqliteTokenStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    let (config, command) = Config::load()?;
    config.validate()?;

    // Logs go to stderr so command output stays machine-readable
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true);

    if config.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    tracing::debug!(
        api_url = %config.api_url,
        state_db = %config.state_db.display(),
        "SafeDocs client starting"
    );

    let store = SqliteTokenStore::open(&config.state_db).with_context(|| {
        format!(
            "Failed to open session database {}",
            config.state_db.display()
        )
    })?;
    let auth = AuthService::new(&config.api_url, config.http_request_timeout)?;
    let session = Arc::new(SessionManager::new(auth, Arc::new(store)));

    spawn_event_logger(&session);

    let client = SessionClient::new(
        &config.api_url,
        Arc::clone(&session),
        config.http_connect_timeout,
        config.http_request_timeout,
    )?;

    match command {
        Command::Login { id_token } => login(&session, id_token).await,
        Command::Logout => {
            session.logout().await?;
            eprintln!("Signed out");
            Ok(())
        }
        command => {
            if !session.restore().await? {
                anyhow::bail!("Not signed in. Run `safedocs login` first.");
            }
            run(&client, command).await
        }
    }
}

/// Log session notifications for the lifetime of the process
fn spawn_event_logger(session: &SessionManager) {
    let mut events = session.subscribe();

    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(SessionEvent::Refreshed(_)) => {
                    tracing::info!("Session tokens rotated");
                }
                Ok(SessionEvent::Ended(reason)) => {
                    tracing::warn!(reason = ?reason, "Session ended");
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Session event logger lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}

async fn login(session: &SessionManager, id_token: Option<String>) -> Result<()> {
    let id_token = match id_token {
        Some(token) => token,
        None => dialoguer::Password::new()
            .with_prompt("Google ID token")
            .interact()
            .context("Failed to read Google ID token")?,
    };

    if id_token.trim().is_empty() {
        anyhow::bail!("Google ID token cannot be empty");
    }

    session.login_with_google(id_token.trim()).await?;

    match session.user().await {
        Some(user) => print_json(&user),
        None => {
            eprintln!("Signed in");
            Ok(())
        }
    }
}

async fn run(client: &SessionClient, command: Command) -> Result<()> {
    match command {
        Command::Whoami => {
            let user = client
                .session()
                .user()
                .await
                .context("Access token carries no readable user claims")?;
            print_json(&user)
        }
        Command::Folders(command) => run_folders(client, command).await,
        Command::Docs(command) => run_docs(client, command).await,
        Command::Shares(command) => run_shares(client, command).await,
        Command::Login { .. } | Command::Logout => Ok(()),
    }
}

async fn run_folders(client: &SessionClient, command: FolderCommand) -> Result<()> {
    let folders = client.folders();

    match command {
        FolderCommand::List { parent } => print_json(&folders.list(parent.as_deref()).await?),
        FolderCommand::Create { name, parent } => {
            let request = CreateFolderRequest {
                name,
                parent_id: parent,
            };
            print_json(&folders.create(&request).await?)
        }
        FolderCommand::Tree { depth } => {
            let cache = FolderCache::new(client.clone(), DEFAULT_FOLDER_TTL);
            print_json(&folder_tree(&cache, depth).await?)
        }
        FolderCommand::Access { folder_id } => print_json(&folders.access(&folder_id).await?),
        FolderCommand::Docs { folder_id } => print_json(&folders.documents(&folder_id).await?),
        FolderCommand::Shared => print_json(&folders.shared_folders().await?),
    }
}

async fn run_docs(client: &SessionClient, command: DocCommand) -> Result<()> {
    let documents = client.documents();

    match command {
        DocCommand::Get { id } => print_json(&documents.get(&id).await?),
        DocCommand::Create {
            title,
            folder,
            expires_at,
            tags,
            file,
        } => {
            let expires_at = expires_at
                .map(|s| {
                    chrono::DateTime::parse_from_rfc3339(&s)
                        .map(|dt| dt.with_timezone(&chrono::Utc))
                        .with_context(|| format!("Invalid --expires-at timestamp: {}", s))
                })
                .transpose()?;

            let tags = if tags.is_empty() {
                None
            } else {
                Some(
                    tags.iter()
                        .map(|t| config::parse_tag(t))
                        .collect::<Result<HashMap<_, _>>>()?,
                )
            };

            let request = CreateDocumentRequest {
                title,
                folder_id: folder,
                expires_at,
                tags,
            };
            let document = documents.create(&request).await?;

            if let Some(path) = file {
                let part = file_part(&path, None).await?;
                documents.upload_file(&document.id, part).await?;
                return print_json(&documents.get(&document.id).await?);
            }
            print_json(&document)
        }
        DocCommand::Search(args) => {
            let search = DocumentSearch {
                query: args.query,
                tag_key: args.tag_key,
                tag_value: args.tag_value,
            };
            print_json(&documents.search(&search).await?)
        }
        DocCommand::Expiring => print_json(&documents.expiring_soon().await?),
        DocCommand::Upload { id, path, mime } => {
            let part = file_part(&path, mime).await?;
            print_json(&documents.upload_file(&id, part).await?)
        }
        DocCommand::Versions { id } => print_json(&documents.versions(&id).await?),
        DocCommand::AddVersion { id, path, mime } => {
            let part = file_part(&path, mime).await?;
            print_json(&documents.add_version(&id, part).await?)
        }
        DocCommand::Revert { id, version } => {
            print_json(&documents.revert_version(&id, version).await?)
        }
        DocCommand::Download { id, output } => {
            let bytes = documents.download_to(&id, &output).await?;
            print_json(&serde_json::json!({
                "path": output.display().to_string(),
                "bytes": bytes,
            }))
        }
        DocCommand::Shared => print_json(&client.folders().shared_documents().await?),
        DocCommand::View { id, output } => {
            let bytes = client.files().view_to(&id, &output).await?;
            print_json(&serde_json::json!({
                "path": output.display().to_string(),
                "bytes": bytes,
            }))
        }
        DocCommand::ViewUrl { id } => {
            println!("{}", client.files().view_url(&id));
            Ok(())
        }
        DocCommand::ThumbnailUrl { id, width, height } => {
            let size = ThumbnailSize { width, height };
            println!("{}", client.files().thumbnail_url(&id, size));
            Ok(())
        }
    }
}

async fn run_shares(client: &SessionClient, command: ShareCommand) -> Result<()> {
    let shares = client.shares();

    match command {
        ShareCommand::List { folder_id } => print_json(&shares.list(&folder_id).await?),
        ShareCommand::Add {
            folder_id,
            email,
            permission,
        } => {
            let request = CreateShareRequest {
                target_email: email,
                permission,
            };
            print_json(&shares.create(&folder_id, &request).await?)
        }
        ShareCommand::Revoke { folder_id, user_id } => {
            shares.revoke(&folder_id, &user_id).await?;
            eprintln!("Share revoked");
            Ok(())
        }
        ShareCommand::RevokeEmail { folder_id, email } => {
            shares.revoke_by_email(&folder_id, &email).await?;
            eprintln!("Share revoked");
            Ok(())
        }
    }
}

async fn file_part(path: &Path, mime: Option<String>) -> Result<FilePart> {
    let part = FilePart::from_path(path).await?;
    Ok(match mime {
        Some(mime) => part.mime(mime),
        None => part,
    })
}

#[derive(Serialize)]
struct FolderNode {
    id: String,
    name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<FolderNode>,
}

/// Expand the folder tree level by level down to `depth`
async fn folder_tree(cache: &FolderCache, depth: usize) -> Result<Vec<FolderNode>> {
    let roots = cache.children(None).await?;

    let mut children: HashMap<String, Vec<Folder>> = HashMap::new();
    let mut frontier: Vec<String> = roots.iter().map(|f| f.id.clone()).collect();

    for _ in 1..depth {
        if frontier.is_empty() {
            break;
        }
        let expanded = cache.expand_many(&frontier).await?;
        frontier = expanded
            .iter()
            .flat_map(|(_, folders)| folders.iter().map(|f| f.id.clone()))
            .collect();
        children.extend(expanded);
    }

    Ok(roots
        .into_iter()
        .map(|folder| build_node(folder, &mut children))
        .collect())
}

fn build_node(folder: Folder, children: &mut HashMap<String, Vec<Folder>>) -> FolderNode {
    let kids = children.remove(&folder.id).unwrap_or_default();
    FolderNode {
        children: kids
            .into_iter()
            .map(|child| build_node(child, children))
            .collect(),
        id: folder.id,
        name: folder.name,
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
