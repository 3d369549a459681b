use std::{path::Path, process, sync::Arc, time::Duration};

use bytes::Bytes;
use dialoguer::Confirm;
use pressroom::{
    application::{
        admin::{
            AuthoringSession,
            notices::NoticeLog,
            posts::{AuthoringError, DraftFields},
            search::SearchView,
        },
        assets::AssetUploader,
        error::AppError,
        feed::{PublicationListCache, ReaderFeedView},
        pagination::Page,
        repos::PostsRepo,
    },
    changefeed::ChangeFeedListener,
    config::{self, Command, Settings},
    domain::{assets::PendingImage, entities::PostRecord},
    infra::{
        assets::FsAssetStore,
        changefeed::PgChangeTransport,
        db::PostgresRepositories,
        error::InfraError,
        identity::StaticIdentity,
        telemetry,
    },
};
use sqlx::postgres::PgPool;
use time::format_description::well_known::Rfc3339;
use tokio::io::AsyncReadExt;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

const WATCH_POLL: Duration = Duration::from_millis(250);

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        if matches!(error, AppError::Authoring(AuthoringError::Cancelled)) {
            println!("Cancelled.");
            return;
        }
        report_application_error(&error);
        process::exit(i32::from(error.exit_code()));
    }
}

fn report_application_error(error: &AppError) {
    let report = error.report();
    if dispatcher::has_been_set() {
        error!(error = %error, chain = ?report.messages, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(std::io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, chain = ?report.messages, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;
    telemetry::init(&settings.logging)?;

    let pool = connect(&settings).await?;
    if matches!(cli_args.command, Command::Migrate) {
        PostgresRepositories::run_migrations(&pool)
            .await
            .map_err(InfraError::from)?;
        info!("Migrations applied");
        return Ok(());
    }

    let runtime = Runtime::new(settings, pool)?;
    match cli_args.command {
        Command::Migrate => Ok(()),
        Command::Feed(args) => runtime.feed(args.page, args.output.json).await,
        Command::Watch(args) => runtime.watch(args.page).await,
        Command::List(args) => runtime.list(args.search.unwrap_or_default()).await,
        Command::Stats(args) => runtime.stats(args.json).await,
        Command::Create(args) => runtime.create(args).await,
        Command::Edit(args) => runtime.edit(args).await,
        Command::Toggle(args) => runtime.toggle(args.id).await,
        Command::Delete(args) => runtime.delete(args.id, args.yes).await,
        Command::Show(args) => runtime.show(args.id).await,
    }
}

async fn connect(settings: &Settings) -> Result<PgPool, AppError> {
    let url = settings.database.url.as_deref().ok_or_else(|| {
        InfraError::configuration("database.url is required (PRESSROOM__DATABASE__URL)")
    })?;
    let pool = PostgresRepositories::connect(url, settings.database.max_connections.get())
        .await
        .map_err(InfraError::from)?;
    Ok(pool)
}

struct Runtime {
    settings: Settings,
    pool: PgPool,
    repo: Arc<PostgresRepositories>,
    uploader: AssetUploader,
    notices: Arc<NoticeLog>,
}

impl Runtime {
    fn new(settings: Settings, pool: PgPool) -> Result<Self, AppError> {
        let repo = Arc::new(PostgresRepositories::new(pool.clone()));
        let store = FsAssetStore::new(
            settings.uploads.directory.clone(),
            settings.uploads.public_base_url.clone(),
        )
        .map_err(InfraError::from)?;

        Ok(Self {
            settings,
            pool,
            repo,
            uploader: AssetUploader::new(Arc::new(store)),
            notices: Arc::new(NoticeLog::new()),
        })
    }

    fn listener(&self) -> ChangeFeedListener {
        let change_feed = self.settings.feed.change_feed();
        let transport =
            PgChangeTransport::new(self.pool.clone(), change_feed.signal_buffer_non_zero());
        ChangeFeedListener::new(Arc::new(transport), change_feed.topic)
    }

    fn cache(&self) -> Arc<PublicationListCache> {
        let repo: Arc<dyn PostsRepo> = self.repo.clone();
        Arc::new(PublicationListCache::new(
            repo,
            self.settings.feed.public_site_url.as_str(),
        ))
    }

    async fn session(&self) -> Result<AuthoringSession, AppError> {
        let operator = self.settings.operator.operator().ok_or_else(|| {
            InfraError::configuration("operator.id is required (PRESSROOM__OPERATOR__ID)")
        })?;
        let identity = StaticIdentity::signed_in(operator);
        let mut session = AuthoringSession::new(
            self.repo.clone(),
            self.uploader.clone(),
            Arc::new(identity),
            self.notices.clone(),
            self.listener(),
        );
        session.activate().await?;
        Ok(session)
    }

    async fn feed(&self, page: usize, json: bool) -> Result<(), AppError> {
        let cache = self.cache();
        cache.refresh().await?;
        let page = cache.page(page, self.settings.feed.page_size);
        if json {
            print_json(&page)
        } else {
            print_feed(&page, &cache);
            Ok(())
        }
    }

    async fn watch(&self, page: usize) -> Result<(), AppError> {
        let cache = self.cache();
        let mut view = ReaderFeedView::new(
            cache.clone(),
            self.listener(),
            self.settings.feed.page_size,
        );
        view.go_to(page);
        view.activate().await?;
        if !view.is_live() {
            info!("Change feed unavailable; showing last known feed");
        }

        let mut shown = cache.version();
        print_feed(&view.current_page(), &cache);
        let mut ticker = tokio::time::interval(WATCH_POLL);
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                _ = ticker.tick() => {
                    let version = cache.version();
                    if version != shown {
                        shown = version;
                        print_feed(&view.current_page(), &cache);
                    }
                }
            }
        }

        view.deactivate();
        Ok(())
    }

    async fn list(&self, query: String) -> Result<(), AppError> {
        let session = self.session().await?;
        let search = SearchView::new(query);
        let posts = session.posts().with_posts(|posts| search.apply(posts));

        for post in &posts {
            let state = if post.published { "published" } else { "draft" };
            println!(
                "{}  {:<9}  {}  {}",
                post.id,
                state,
                format_time(post),
                post.title
            );
        }
        println!("{} post(s)", posts.len());
        Ok(())
    }

    async fn stats(&self, json: bool) -> Result<(), AppError> {
        let session = self.session().await?;
        let counts = session.posts().stats();
        if json {
            return print_json(&counts);
        }
        println!("total:     {}", counts.total);
        println!("published: {}", counts.published);
        println!("drafts:    {}", counts.drafts);
        Ok(())
    }

    async fn create(&self, args: config::CreateArgs) -> Result<(), AppError> {
        let content = read_content(args.content).await?;
        let image = load_image(args.image.as_deref()).await?;

        let mut session = self.session().await?;
        let fields = session.open_new().await?;
        fields.title = args.title;
        fields.description = args.description;
        fields.content = content;
        if let Some(author) = args.author {
            fields.author = author;
        }
        fields.pending_image = image;
        fields.published = !args.draft;

        let result = session.submit().await;
        self.flush_notices();
        let outcome = result?;
        println!("{}", outcome.post().id);
        Ok(())
    }

    async fn edit(&self, args: config::EditArgs) -> Result<(), AppError> {
        let content = match args.content {
            Some(content) => Some(read_content(content).await?),
            None => None,
        };
        let image = load_image(args.image.as_deref()).await?;

        let mut session = self.session().await?;
        let fields = session.open_edit(args.id).await?;
        apply_edits(
            fields,
            args.title,
            args.description,
            content,
            args.author,
            args.published,
        );
        if image.is_some() {
            fields.pending_image = image;
        }

        let result = session.submit().await;
        self.flush_notices();
        result?;
        Ok(())
    }

    async fn toggle(&self, id: uuid::Uuid) -> Result<(), AppError> {
        let mut session = self.session().await?;
        let result = session.toggle_publish(id).await;
        self.flush_notices();
        result?;
        Ok(())
    }

    async fn delete(&self, id: uuid::Uuid, assume_yes: bool) -> Result<(), AppError> {
        let mut session = self.session().await?;
        let confirm = |prompt: &str| {
            assume_yes
                || Confirm::new()
                    .with_prompt(prompt)
                    .default(false)
                    .interact()
                    .unwrap_or(false)
        };
        let result = session.delete_post(id, &confirm).await;
        self.flush_notices();
        result?;
        Ok(())
    }

    async fn show(&self, id: uuid::Uuid) -> Result<(), AppError> {
        let cache = self.cache();
        let post = cache.published_post(id).await?;

        println!("{}", post.title);
        println!("by {} on {}", post.display_author(), format_time(&post));
        if let Some(image) = &post.image_ref {
            println!("image: {image}");
        }
        println!();
        println!("{}", post.content);
        println!();
        println!("share: {}", cache.share_url(post.id));
        Ok(())
    }

    fn flush_notices(&self) {
        for notice in self.notices.drain() {
            if notice.is_error() {
                eprintln!("error: {notice}");
            } else {
                println!("{notice}");
            }
        }
    }
}

fn apply_edits(
    fields: &mut DraftFields,
    title: Option<String>,
    description: Option<String>,
    content: Option<String>,
    author: Option<String>,
    published: Option<bool>,
) {
    if let Some(title) = title {
        fields.title = title;
    }
    if let Some(description) = description {
        fields.description = description;
    }
    if let Some(content) = content {
        fields.content = content;
    }
    if let Some(author) = author {
        fields.author = author;
    }
    if let Some(published) = published {
        fields.published = published;
    }
}

async fn read_content(value: String) -> Result<String, AppError> {
    if value != "-" {
        return Ok(value);
    }
    let mut buffer = String::new();
    tokio::io::stdin()
        .read_to_string(&mut buffer)
        .await
        .map_err(InfraError::from)?;
    Ok(buffer)
}

async fn load_image(path: Option<&Path>) -> Result<Option<PendingImage>, AppError> {
    let Some(path) = path else {
        return Ok(None);
    };
    let data = tokio::fs::read(path).await.map_err(InfraError::from)?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("image")
        .to_string();
    Ok(Some(PendingImage::from_file_name(file_name, Bytes::from(data))?))
}

fn print_feed(page: &Page<PostRecord>, cache: &PublicationListCache) {
    if page.is_empty() {
        println!("(no posts on page {})", page.number);
    }
    for post in &page.items {
        println!("{}", post.title);
        println!("  {}", post.description);
        println!(
            "  {} · {} · {}",
            post.display_author(),
            format_time(post),
            cache.share_url(post.id)
        );
    }
    if page.page_count > 1 {
        let numbers: Vec<String> = (1..=page.page_count)
            .map(|number| {
                if number == page.number {
                    format!("[{number}]")
                } else {
                    number.to_string()
                }
            })
            .collect();
        println!("pages: {}", numbers.join(" "));
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::unexpected(format!("failed to encode output: {err}")))?;
    println!("{rendered}");
    Ok(())
}

fn format_time(post: &PostRecord) -> String {
    post.created_at
        .format(&Rfc3339)
        .unwrap_or_else(|_| post.created_at.to_string())
}
