use anyhow::Context;
use aora_backend::VideoPost;
use aora_config::load as load_config;
use aora_content::{QueryResult, QueryStatus};
use aora_publish::{Draft, MediaAsset};
use aora_runtime::{shutdown_signal, telemetry, ClientServices};
use aora_session::SessionStatus;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader, Stdin};
use tracing::info;

#[derive(Parser)]
#[command(name = "aora")]
#[command(about = "Aora video feed client (console by default)")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every post
    Feed,
    /// Print the newest posts
    Latest,
    /// Search post titles
    Search { query: String },
    /// Print the posts of one creator
    UserPosts { user_id: String },
    /// Start interactive console (default)
    Console,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    telemetry::init_tracing().context("failed to initialise tracing")?;
    let config = load_config().context("failed to load configuration")?;
    let services =
        ClientServices::initialise(&config).context("failed to initialise client services")?;

    match cli.command.unwrap_or(Commands::Console) {
        Commands::Feed => {
            let posts = services
                .repository
                .list_all()
                .await
                .context("failed to list posts")?;
            print_posts(&posts);
            Ok(())
        }
        Commands::Latest => {
            let posts = services
                .repository
                .latest()
                .await
                .context("failed to list latest posts")?;
            print_posts(&posts);
            Ok(())
        }
        Commands::Search { query } => {
            let posts = services
                .repository
                .search(&query)
                .await
                .with_context(|| format!("failed to search for {query:?}"))?;
            print_posts(&posts);
            Ok(())
        }
        Commands::UserPosts { user_id } => {
            let posts = services
                .repository
                .list_by_user(&user_id)
                .await
                .with_context(|| format!("failed to list posts of {user_id}"))?;
            print_posts(&posts);
            Ok(())
        }
        Commands::Console => run_console(services).await,
    }
}

async fn run_console(services: ClientServices) -> anyhow::Result<()> {
    info!("starting interactive console");

    let status = services.start().await;

    println!("Aora Interactive Console");
    match (status, services.session.identity()) {
        (SessionStatus::Authenticated, Some(identity)) => {
            println!("Signed in as {} <{}>", identity.username, identity.email)
        }
        _ => println!("Not signed in. Use '/login' or '/register'"),
    }
    println!("Type '/help' for commands. Use Ctrl+C or '/quit' to exit");
    println!("---");

    let stdin = tokio::io::stdin();
    let mut reader = BufReader::new(stdin);
    let mut line = String::new();

    loop {
        print!("> ");
        std::io::Write::flush(&mut std::io::stdout())?;

        line.clear();
        let bytes_read = tokio::select! {
            read = reader.read_line(&mut line) => read?,
            _ = shutdown_signal() => break,
        };
        if bytes_read == 0 {
            break; // EOF
        }

        let input = line.trim().to_string();
        if input.is_empty() {
            continue;
        }
        let (command, args) = match input.split_once(' ') {
            Some((command, args)) => (command, args.trim()),
            None => (input.as_str(), ""),
        };

        match command {
            "/quit" | "/exit" | "/q" => {
                println!("Goodbye!");
                break;
            }
            "/help" | "/h" => print_help(),
            "/register" => {
                let parts: Vec<&str> = args.split_whitespace().collect();
                let [email, password, username] = parts.as_slice() else {
                    println!("Usage: /register <email> <password> <username>");
                    continue;
                };
                match services.session.register(email, password, username).await {
                    Ok(identity) => println!("Registered and signed in as {}", identity.username),
                    Err(error) => println!("Registration failed: {error}"),
                }
            }
            "/login" => {
                let parts: Vec<&str> = args.split_whitespace().collect();
                let [email, password] = parts.as_slice() else {
                    println!("Usage: /login <email> <password>");
                    continue;
                };
                match services.session.login(email, password).await {
                    Ok(_) => match services.session.identity() {
                        Some(identity) => println!("Signed in as {}", identity.username),
                        None => println!("Signed in, but no profile was found"),
                    },
                    Err(error) => println!("Sign-in failed: {error}"),
                }
            }
            "/logout" => {
                services.session.logout().await;
                println!("Signed out");
            }
            "/whoami" | "/me" => match services.session.identity() {
                Some(identity) => println!(
                    "{} <{}> (user {}, account {})",
                    identity.username, identity.email, identity.id, identity.account_id
                ),
                None => println!("Not signed in"),
            },
            "/feed" | "/f" => print_query("All posts", &services.posts.fetch_all_posts().await),
            "/latest" | "/l" => {
                print_query("Latest posts", &services.posts.fetch_latest_posts().await)
            }
            "/search" | "/s" => {
                if args.is_empty() {
                    println!("Usage: /search <title words>");
                    continue;
                }
                let label = format!("Results for {args:?}");
                print_query(&label, &services.posts.search_posts(args).await);
            }
            "/mine" | "/m" => match services.session.identity() {
                Some(identity) => print_query(
                    "Your posts",
                    &services.posts.fetch_user_posts(&identity.id).await,
                ),
                None => println!("Sign in first"),
            },
            "/refresh" | "/r" => {
                let status = services.posts.refresh().await;
                if status.errored {
                    println!("Refresh finished with errors");
                } else {
                    println!("Refreshed");
                }
                print_query("Latest posts", &services.posts.latest());
            }
            "/publish" | "/p" => {
                if let Err(error) = publish_from_console(&services, &mut reader, args).await {
                    println!("Publish failed: {error:#}");
                }
            }
            other => println!("Unknown command: {other}. Type '/help' for commands"),
        }
    }

    Ok(())
}

fn print_help() {
    println!("Available commands:");
    println!("  /help, /h                               - Show this help");
    println!("  /register <email> <password> <username> - Create an account");
    println!("  /login <email> <password>               - Sign in");
    println!("  /logout                                 - Sign out");
    println!("  /whoami, /me                            - Show the signed-in user");
    println!("  /feed, /f                               - List all posts");
    println!("  /latest, /l                             - List the newest posts");
    println!("  /search, /s <words>                     - Search post titles");
    println!("  /mine, /m                               - List your posts");
    println!("  /refresh, /r                            - Refetch all and latest posts");
    println!("  /publish, /p <thumbnail> <video>        - Publish a new post");
    println!("  /quit, /exit, /q                        - Exit console");
}

async fn publish_from_console(
    services: &ClientServices,
    reader: &mut BufReader<Stdin>,
    args: &str,
) -> anyhow::Result<()> {
    let Some(identity) = services.session.identity() else {
        println!("Sign in first");
        return Ok(());
    };
    let parts: Vec<&str> = args.split_whitespace().collect();
    let [thumbnail, video] = parts.as_slice() else {
        println!("Usage: /publish <thumbnail> <video>");
        return Ok(());
    };

    let thumbnail = MediaAsset::from_path(thumbnail).await?;
    let video = MediaAsset::from_path(video).await?;
    let title = read_prompt(reader, "Title: ").await?;
    let prompt = read_prompt(reader, "Prompt: ").await?;

    let draft = Draft::new(title, prompt, thumbnail, video, identity.id);
    println!("Uploading {} and {}...", draft.thumbnail.name, draft.video.name);
    let post = services.publisher.publish(draft).await?;
    println!("Published \"{}\" ({})", post.title, post.id);
    Ok(())
}

async fn read_prompt(reader: &mut BufReader<Stdin>, label: &str) -> anyhow::Result<String> {
    print!("{label}");
    std::io::Write::flush(&mut std::io::stdout())?;

    let mut value = String::new();
    reader.read_line(&mut value).await?;
    Ok(value.trim().to_string())
}

fn print_query(label: &str, result: &QueryResult<VideoPost>) {
    if result.status == QueryStatus::Error {
        println!(
            "{label} failed: {}",
            result.error.as_deref().unwrap_or("unknown error")
        );
        return;
    }
    println!("{label}:");
    print_posts(&result.items);
}

fn print_posts(posts: &[VideoPost]) {
    if posts.is_empty() {
        println!("No posts found");
        return;
    }

    for post in posts {
        let creator = post
            .creator
            .profile()
            .map(|profile| profile.username.as_str())
            .unwrap_or_else(|| post.creator.id());
        println!(
            "  {}: {} by {} ({})",
            post.id,
            post.title,
            creator,
            post.created_at.format("%Y-%m-%d %H:%M")
        );
    }
}
