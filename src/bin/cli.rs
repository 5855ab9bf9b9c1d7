use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::net::SocketAddr;
use taxonomy_rest_api::client::{
    self, CreateNodeRequest, ListFilter, NodeTreeResponse, TaxonomyKind, UpdateNodeRequest,
};
use taxonomy_rest_api::config::Config;
use taxonomy_rest_api::{api, db};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        /// The address to bind to [env: TAXONOMY_BIND_ADDR]
        #[arg(short, long)]
        addr: Option<SocketAddr>,
        /// SQLite database file, or :memory: [env: DATABASE_URL]
        #[arg(long)]
        database_url: Option<String>,
        /// Maximum number of pooled connections [env: DATABASE_POOL_SIZE]
        #[arg(long)]
        pool_size: Option<u32>,
    },
    /// Client commands
    Client {
        /// The base URL of the API
        #[arg(long, default_value = taxonomy_rest_api::BASE_URL)]
        url: String,
        #[command(subcommand)]
        command: ClientCommands,
    },
}

#[derive(Subcommand)]
enum ClientCommands {
    /// Tag hierarchy commands
    Tags {
        #[command(subcommand)]
        command: NodeCommands,
    },
    /// Group hierarchy commands
    Groups {
        #[command(subcommand)]
        command: NodeCommands,
    },
}

#[derive(Subcommand)]
enum NodeCommands {
    /// List nodes ordered by path
    List {
        /// Include inactive nodes
        #[arg(long)]
        include_inactive: bool,
        /// Only direct children of this node
        #[arg(long)]
        parent_id: Option<i32>,
        /// Only root nodes
        #[arg(long, conflicts_with = "parent_id")]
        roots_only: bool,
    },
    /// Show a single node
    Get { id: i32 },
    /// Look a node up by slug
    BySlug { slug: String },
    /// Look a node up by its full path, e.g. /marketing/salon
    ByPath { path: String },
    /// Create a node
    Create {
        name: String,
        slug: String,
        #[arg(long)]
        parent_id: Option<i32>,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        icon: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        sort_order: Option<i32>,
        /// Create the node as inactive
        #[arg(long)]
        inactive: bool,
    },
    /// Update a node. An empty string clears color, icon or description
    Update {
        id: i32,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        slug: Option<String>,
        /// Move the node under this parent
        #[arg(long)]
        parent_id: Option<i32>,
        /// Move the node to the root
        #[arg(long, conflicts_with = "parent_id")]
        root: bool,
        #[arg(long)]
        sort_order: Option<i32>,
        #[arg(long)]
        active: Option<bool>,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        icon: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a leaf node
    Delete { id: i32 },
    /// Display the node tree
    Tree {
        /// Display simplified tree with only IDs, slugs and names
        #[arg(long)]
        simple: bool,
        /// Include inactive subtrees
        #[arg(long)]
        include_inactive: bool,
    },
    /// Direct children of a node
    Children { id: i32 },
    /// IDs of every node below a node
    Descendants { id: i32 },
    /// Ancestors of a node, root first
    Ancestors { id: i32 },
    /// Entities attached to a node
    Assignments { id: i32 },
    /// Attach an entity to a node
    Assign {
        id: i32,
        entity_type: String,
        entity_id: String,
    },
    /// Detach an entity from a node
    Unassign {
        id: i32,
        entity_type: String,
        entity_id: String,
    },
    /// Report path, level and parent problems
    Check,
    /// Recompute every path and level from the parent links
    Rebuild,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            addr,
            database_url,
            pool_size,
        } => {
            init_tracing();

            let mut config = Config::from_env().context("Invalid configuration")?;
            if let Some(addr) = addr {
                config.bind_addr = addr;
            }
            if let Some(database_url) = database_url {
                config.database_url = database_url;
            }
            if let Some(pool_size) = pool_size {
                anyhow::ensure!(pool_size >= 1, "--pool-size must be at least 1");
                config.pool_size = pool_size;
            }

            serve(config).await
        }
        Commands::Client { url, command } => {
            let (kind, command) = match command {
                ClientCommands::Tags { command } => (TaxonomyKind::Tag, command),
                ClientCommands::Groups { command } => (TaxonomyKind::Group, command),
            };
            run_client(&url, kind, command).await
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn serve(config: Config) -> anyhow::Result<()> {
    // Set up database connection pool
    let pool = db::establish_pool(&config)
        .with_context(|| format!("Failed to open database '{}'", config.database_url))?;

    // Create router with connection pool
    let app = api::create_router(pool);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("Starting server on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
}

async fn run_client(url: &str, kind: TaxonomyKind, command: NodeCommands) -> anyhow::Result<()> {
    match command {
        NodeCommands::List {
            include_inactive,
            parent_id,
            roots_only,
        } => {
            let filter = ListFilter {
                include_inactive,
                parent_id,
                roots_only,
            };
            print_json(&client::list_nodes(url, kind, &filter).await?)
        }
        NodeCommands::Get { id } => print_json(&client::get_node(url, kind, id).await?),
        NodeCommands::BySlug { slug } => {
            print_json(&client::get_node_by_slug(url, kind, &slug).await?)
        }
        NodeCommands::ByPath { path } => {
            print_json(&client::get_node_by_path(url, kind, &path).await?)
        }
        NodeCommands::Create {
            name,
            slug,
            parent_id,
            color,
            icon,
            description,
            sort_order,
            inactive,
        } => {
            let request = CreateNodeRequest {
                name,
                slug,
                parent_id,
                color,
                icon,
                description,
                sort_order,
                is_active: inactive.then_some(false),
            };
            print_json(&client::create_node(url, kind, &request).await?)
        }
        NodeCommands::Update {
            id,
            name,
            slug,
            parent_id,
            root,
            sort_order,
            active,
            color,
            icon,
            description,
        } => {
            let parent_id = if root { Some(None) } else { parent_id.map(Some) };
            let request = UpdateNodeRequest {
                name,
                slug,
                parent_id,
                sort_order,
                is_active: active,
                color: color.map(clearable),
                icon: icon.map(clearable),
                description: description.map(clearable),
            };
            print_json(&client::update_node(url, kind, id, &request).await?)
        }
        NodeCommands::Delete { id } => {
            client::delete_node(url, kind, id).await?;
            println!("Deleted {} {}", kind, id);
            Ok(())
        }
        NodeCommands::Tree {
            simple,
            include_inactive,
        } => {
            let tree = client::get_tree(url, kind, include_inactive).await?;
            if simple {
                print_simple_tree(&tree)
            } else {
                print_json(&tree)
            }
        }
        NodeCommands::Children { id } => print_json(&client::get_children(url, kind, id).await?),
        NodeCommands::Descendants { id } => {
            print_json(&client::get_descendants(url, kind, id).await?)
        }
        NodeCommands::Ancestors { id } => print_json(&client::get_ancestors(url, kind, id).await?),
        NodeCommands::Assignments { id } => {
            print_json(&client::list_assignments(url, kind, id).await?)
        }
        NodeCommands::Assign {
            id,
            entity_type,
            entity_id,
        } => print_json(&client::assign(url, kind, id, &entity_type, &entity_id).await?),
        NodeCommands::Unassign {
            id,
            entity_type,
            entity_id,
        } => {
            client::unassign(url, kind, id, &entity_type, &entity_id).await?;
            println!("Detached {}:{} from {} {}", entity_type, entity_id, kind, id);
            Ok(())
        }
        NodeCommands::Check => print_json(&client::check_consistency(url, kind).await?),
        NodeCommands::Rebuild => print_json(&client::rebuild_paths(url, kind).await?),
    }
}

fn clearable(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_simple_tree(nodes: &[NodeTreeResponse]) -> anyhow::Result<()> {
    let mut out = String::new();
    write_simple_tree(&mut out, nodes, 0)?;
    print!("{}", out);
    Ok(())
}

// Slugs and names are written as JSON strings, which YAML reads as
// double-quoted scalars whatever characters a name contains.
fn write_simple_tree(
    out: &mut String,
    nodes: &[NodeTreeResponse],
    depth: usize,
) -> serde_json::Result<()> {
    for node in nodes {
        let indent = "  ".repeat(depth + 1);
        out.push_str(&format!("{}{}:\n", "  ".repeat(depth), node.data.id));
        out.push_str(&format!("{indent}slug: {}\n", serde_json::to_string(&node.data.slug)?));
        out.push_str(&format!("{indent}name: {}\n", serde_json::to_string(&node.data.name)?));
        if !node.children.is_empty() {
            out.push_str(&format!("{indent}children:\n"));
            write_simple_tree(out, &node.children, depth + 2)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use taxonomy_rest_api::client::NodeResponse;
    use taxonomy_rest_api::hierarchy::TreeNode;

    fn leaf(id: i32, slug: &str, name: &str) -> NodeTreeResponse {
        let at = chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        TreeNode {
            data: NodeResponse {
                id,
                name: name.to_string(),
                slug: slug.to_string(),
                parent_id: None,
                path: format!("/{slug}"),
                level: 0,
                sort_order: 0,
                is_active: true,
                color: None,
                icon: None,
                description: None,
                created_at: at,
                updated_at: at,
            },
            children: Vec::new(),
        }
    }

    #[test]
    fn test_simple_tree_quotes_names() {
        let mut root = leaf(1, "ops", "Ops: on-call # primary");
        root.children.push(leaf(2, "pager", "Say \"hi\""));

        let mut out = String::new();
        write_simple_tree(&mut out, &[root], 0).unwrap();

        let expected = concat!(
            "1:\n",
            "  slug: \"ops\"\n",
            "  name: \"Ops: on-call # primary\"\n",
            "  children:\n",
            "    2:\n",
            "      slug: \"pager\"\n",
            "      name: \"Say \\\"hi\\\"\"\n",
        );
        assert_eq!(out, expected);
    }
}
