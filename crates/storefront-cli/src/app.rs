//! Command handlers for the storefront CLI.
//!
//! `App` owns the loaded config and one `Storefront`; every subcommand maps
//! onto one or two session/catalog operations and prints the result.

use std::io::{self, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use futures::future;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{info, warn};

use storefront_core::models::{
    CategoryInput, LoginRequest, ProductFilters, ProductInput, ProductQuery, ProfileUpdate, RegisterRequest,
    SortOrder,
};
use storefront_core::{Config, CredentialStore, ImageUpload, Navigation, Route, SessionEvent, Storefront};

use crate::output;
use crate::{CategoriesCommand, CategoryArgs, Command, ListArgs, ProductArgs, ProductsCommand, ProfileCommand};

// ============================================================================
// Constants
// ============================================================================

/// Products shown next to categories in `overview`
const OVERVIEW_PRODUCT_LIMIT: u32 = 5;

pub struct App {
    config: Config,
    storefront: Storefront,
    events: broadcast::Receiver<SessionEvent>,
}

impl App {
    /// With `ephemeral` the session lives only as long as this process.
    pub fn new(config: Config, ephemeral: bool) -> Result<Self> {
        let storefront = Storefront::new(&config.gateway_config(), credential_store(&config, ephemeral)?)?;
        let events = storefront.session.events();
        if let Err(e) = storefront.session.initialize() {
            warn!(error = %e, "Ignoring unreadable stored session");
        }
        Ok(Self {
            config,
            storefront,
            events,
        })
    }

    pub async fn run(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Login { email } => self.login(email).await,
            Command::Register { name, email } => self.register(name, email).await,
            Command::Logout => {
                self.storefront.session.logout();
                println!("Signed out.");
                Ok(())
            }
            Command::Whoami => self.whoami(),
            Command::Profile(cmd) => self.profile(cmd).await,
            Command::Products(cmd) => self.products(cmd).await,
            Command::Categories(cmd) => self.categories(cmd).await,
            Command::Overview => self.overview().await,
            Command::Route { path } => self.route(&path),
        }
    }

    /// Print a hint when a request ended the session.
    pub fn report_session_events(&mut self) {
        loop {
            match self.events.try_recv() {
                Ok(SessionEvent::Expired { redirect }) => {
                    eprintln!("Session expired. Run `storefront login` to sign in again ({}).", redirect);
                }
                Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
    }

    // =========================================================================
    // Session
    // =========================================================================

    async fn login(&mut self, email: Option<String>) -> Result<()> {
        let email = match email.or_else(|| self.config.last_email.clone()) {
            Some(last) => Self::prompt_with_default("Email", &last)?,
            None => Self::prompt("Email")?,
        };
        let password = rpassword::prompt_password("Password: ")?;
        if email.is_empty() || password.is_empty() {
            bail!("Email and password required");
        }

        let user = self
            .storefront
            .session
            .login(&LoginRequest {
                email: email.clone(),
                password,
            })
            .await?;

        self.remember_email(email);
        info!("Login successful");
        println!("Signed in as {}", output::user_summary(&user));
        Ok(())
    }

    async fn register(&mut self, name: String, email: String) -> Result<()> {
        let password = rpassword::prompt_password("Password: ")?;
        let confirm = rpassword::prompt_password("Confirm password: ")?;
        if password != confirm {
            bail!("Passwords do not match");
        }

        let request = RegisterRequest {
            name,
            email: email.clone(),
            password,
        };
        let user = self.storefront.session.register(&request).await?;

        self.remember_email(email);
        println!("Account created. Signed in as {}", output::user_summary(&user));
        Ok(())
    }

    fn remember_email(&mut self, email: String) {
        self.config.last_email = Some(email);
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }
    }

    fn whoami(&self) -> Result<()> {
        match self.storefront.session.current_user() {
            Some(user) => println!("{}", output::user_summary(&user)),
            None => println!("Not signed in."),
        }
        Ok(())
    }

    async fn profile(&self, command: ProfileCommand) -> Result<()> {
        self.require_route(Route::Profile)?;
        let user = match command {
            ProfileCommand::Show => self.storefront.session.fetch_profile().await?,
            ProfileCommand::Update {
                name,
                email,
                phone,
                address,
            } => {
                let update = ProfileUpdate {
                    name,
                    email,
                    phone,
                    address,
                    ..Default::default()
                };
                if update.is_empty() {
                    bail!("Nothing to update");
                }
                self.storefront.session.update_profile(&update).await?
            }
        };
        println!("{}", serde_json::to_string_pretty(user.fields())?);
        Ok(())
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    async fn products(&self, command: ProductsCommand) -> Result<()> {
        let catalog = &self.storefront.products;
        match command {
            ProductsCommand::List(args) => {
                let products = catalog.fetch_products(&list_query(args)?).await?;
                for product in &products {
                    println!("{}", output::product_line(product));
                }
                println!("{}", output::pagination_footer(&catalog.pagination()));
            }
            ProductsCommand::Show { id } => {
                let product = catalog.fetch_product_by_id(&id).await?;
                println!("{}", output::product_detail(&product));
            }
            ProductsCommand::Search { text } => {
                for product in catalog.search_products(&text).await? {
                    println!("{}", output::product_line(&product));
                }
            }
            ProductsCommand::ByCategory { id, page, limit } => {
                for product in catalog.fetch_products_by_category(&id, page, limit).await? {
                    println!("{}", output::product_line(&product));
                }
                println!("{}", output::pagination_footer(&catalog.pagination()));
            }
            ProductsCommand::Create(args) => {
                self.require_route(Route::CreateProduct)?;
                let (input, image) = product_input(args)?;
                let product = catalog.create_product(&input, image).await?;
                println!("Created {}", output::product_line(&product));
            }
            ProductsCommand::Update { id, fields } => {
                self.require_route(Route::EditProduct(id.clone()))?;
                let (input, image) = product_input(fields)?;
                let product = catalog.update_product(&id, &input, image).await?;
                println!("Updated {}", output::product_line(&product));
            }
            ProductsCommand::Delete { id } => {
                self.require_route(Route::EditProduct(id.clone()))?;
                catalog.delete_product(&id).await?;
                println!("Deleted product {}", id);
            }
        }
        Ok(())
    }

    async fn categories(&self, command: CategoriesCommand) -> Result<()> {
        let manager = &self.storefront.categories;
        match command {
            CategoriesCommand::List { active } => {
                manager.fetch_categories().await?;
                let categories = if active {
                    manager.active_categories()
                } else {
                    manager.categories()
                };
                for category in &categories {
                    println!("{}", output::category_line(category));
                }
                return Ok(());
            }
            CategoriesCommand::Show { id } => {
                let category = manager.fetch_category_by_id(&id).await?;
                println!("{}", output::category_detail(&category));
                return Ok(());
            }
            CategoriesCommand::Create(args) => {
                self.require_route(Route::Categories)?;
                let (input, image) = category_input(args)?;
                let category = manager.create_category(&input, image).await?;
                println!("{}", output::category_line(&category));
            }
            CategoriesCommand::Update { id, fields } => {
                self.require_route(Route::Categories)?;
                let (input, image) = category_input(fields)?;
                let category = manager.update_category(&id, &input, image).await?;
                println!("{}", output::category_line(&category));
            }
            CategoriesCommand::Delete { id } => {
                self.require_route(Route::Categories)?;
                manager.delete_category(&id).await?;
            }
        }
        if let Some(message) = manager.snapshot().success {
            println!("{}", message);
        }
        Ok(())
    }

    async fn overview(&self) -> Result<()> {
        let query = ProductQuery::new().page(1).limit(OVERVIEW_PRODUCT_LIMIT);
        let (products, categories) = future::join(
            self.storefront.products.fetch_products(&query),
            self.storefront.categories.fetch_categories(),
        )
        .await;

        println!("Categories");
        for category in &categories? {
            println!("  {}", output::category_line(category));
        }
        println!("Latest products");
        for product in &products? {
            println!("  {}", output::product_line(product));
        }
        Ok(())
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    fn route(&self, path: &str) -> Result<()> {
        let route: Route = path.parse().map_err(anyhow::Error::msg)?;
        match self.storefront.session.authorize(route) {
            Navigation::Allow(route) => println!("allow {}", route),
            Navigation::Redirect(route) => println!("redirect {}", route),
        }
        Ok(())
    }

    /// Refuse locally when the guard would not let the user reach `route`.
    fn require_route(&self, route: Route) -> Result<()> {
        match self.storefront.session.authorize(route) {
            Navigation::Allow(_) => Ok(()),
            Navigation::Redirect(Route::Login) => bail!("Sign in first: storefront login"),
            Navigation::Redirect(_) => bail!("This action requires an admin account"),
        }
    }

    fn prompt(label: &str) -> Result<String> {
        print!("{}: ", label);
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        Ok(input.trim().to_string())
    }

    fn prompt_with_default(label: &str, default: &str) -> Result<String> {
        let input = Self::prompt(&format!("{} [{}]", label, default))?;
        if input.is_empty() {
            Ok(default.to_string())
        } else {
            Ok(input)
        }
    }
}

fn list_query(args: ListArgs) -> Result<ProductQuery> {
    let sort_order = args
        .sort_order
        .as_deref()
        .map(str::parse::<SortOrder>)
        .transpose()
        .map_err(anyhow::Error::msg)?;
    Ok(ProductQuery {
        page: args.page,
        limit: args.limit,
        filters: ProductFilters {
            search: args.search,
            category: args.category,
            min_price: args.min_price,
            max_price: args.max_price,
            in_stock: args.in_stock.then_some(true),
            featured: args.featured.then_some(true),
            sort_by: args.sort_by,
            sort_order,
        },
    })
}

fn load_image(path: Option<&Path>) -> Result<Option<ImageUpload>> {
    path.map(|p| ImageUpload::from_path(p).with_context(|| format!("Cannot attach {}", p.display())))
        .transpose()
}

fn product_input(args: ProductArgs) -> Result<(ProductInput, Option<ImageUpload>)> {
    let image = load_image(args.image.as_deref())?;
    let input = ProductInput {
        name: args.name,
        description: args.description,
        price: args.price,
        stock: args.stock,
        category: args.category,
        featured: args.featured,
        is_active: args.active,
    };
    Ok((input, image))
}

fn category_input(args: CategoryArgs) -> Result<(CategoryInput, Option<ImageUpload>)> {
    let image = load_image(args.image.as_deref())?;
    let input = CategoryInput {
        name: args.name,
        description: args.description,
        is_active: args.active,
    };
    Ok((input, image))
}

fn credential_store(config: &Config, ephemeral: bool) -> Result<CredentialStore> {
    if ephemeral {
        info!("Using in-memory credentials, nothing will be stored");
        return Ok(CredentialStore::in_memory());
    }
    config.credential_store()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_args() -> ListArgs {
        ListArgs {
            page: Some(2),
            limit: Some(10),
            category: Some("c1".to_string()),
            search: None,
            min_price: None,
            max_price: None,
            in_stock: false,
            featured: true,
            sort_by: None,
            sort_order: Some("asc".to_string()),
        }
    }

    #[test]
    fn test_list_query_from_flags() {
        let query = list_query(list_args()).unwrap();
        assert_eq!(
            query.to_query_string(),
            "page=2&limit=10&category=c1&featured=true&sortOrder=asc"
        );
    }

    #[test]
    fn test_list_query_rejects_bad_sort_order() {
        let mut args = list_args();
        args.sort_order = Some("sideways".to_string());
        assert!(list_query(args).is_err());
    }

    #[test]
    fn test_missing_image_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.png");
        assert!(load_image(Some(&missing)).is_err());
        assert!(load_image(None).unwrap().is_none());
    }

    #[test]
    fn test_ephemeral_credentials_are_not_shared() {
        let config = Config::default();
        let user = serde_json::from_value(serde_json::json!({"id": 1, "role": "admin"})).unwrap();

        let first = credential_store(&config, true).unwrap();
        first.save("T1", &user).unwrap();
        assert!(first.has_credentials());

        let second = credential_store(&config, true).unwrap();
        assert!(!second.has_credentials());
    }
}
