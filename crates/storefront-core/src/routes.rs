//! Navigation table and guard.
//!
//! Routes declare whether they need an authenticated user, an admin, or a
//! guest. `guard` decides whether a navigation may proceed or where it is
//! redirected instead.

use std::fmt;
use std::str::FromStr;

use crate::auth::SessionSnapshot;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Login,
    Register,
    Profile,
    Products,
    ProductDetail(String),
    CreateProduct,
    EditProduct(String),
    Categories,
}

/// Requirements a route places on the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Access {
    pub requires_auth: bool,
    pub requires_admin: bool,
    pub requires_guest: bool,
}

impl Access {
    const PUBLIC: Access = Access {
        requires_auth: false,
        requires_admin: false,
        requires_guest: false,
    };
    const GUEST: Access = Access {
        requires_auth: false,
        requires_admin: false,
        requires_guest: true,
    };
    const USER: Access = Access {
        requires_auth: true,
        requires_admin: false,
        requires_guest: false,
    };
    const ADMIN: Access = Access {
        requires_auth: true,
        requires_admin: true,
        requires_guest: false,
    };
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Allow(Route),
    Redirect(Route),
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Login => "/login".to_string(),
            Route::Register => "/register".to_string(),
            Route::Profile => "/profile".to_string(),
            Route::Products => "/products".to_string(),
            Route::ProductDetail(id) => format!("/products/{}", id),
            Route::CreateProduct => "/products/create".to_string(),
            Route::EditProduct(id) => format!("/products/{}/edit", id),
            Route::Categories => "/categories".to_string(),
        }
    }

    pub fn access(&self) -> Access {
        match self {
            Route::Home | Route::Products | Route::ProductDetail(_) => Access::PUBLIC,
            Route::Login | Route::Register => Access::GUEST,
            Route::Profile => Access::USER,
            Route::CreateProduct | Route::EditProduct(_) | Route::Categories => Access::ADMIN,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

impl FromStr for Route {
    type Err = String;

    fn from_str(path: &str) -> Result<Self, Self::Err> {
        let trimmed = path.split(|c: char| c == '?' || c == '#').next().unwrap_or_default();
        let parts: Vec<&str> = trimmed.split('/').filter(|p| !p.is_empty()).collect();
        match parts.as_slice() {
            [] => Ok(Route::Home),
            ["login"] => Ok(Route::Login),
            ["register"] => Ok(Route::Register),
            ["profile"] => Ok(Route::Profile),
            ["products"] => Ok(Route::Products),
            ["products", "create"] => Ok(Route::CreateProduct),
            ["products", id] => Ok(Route::ProductDetail(id.to_string())),
            ["products", id, "edit"] => Ok(Route::EditProduct(id.to_string())),
            ["categories"] => Ok(Route::Categories),
            _ => Err(format!("unknown route: {}", path)),
        }
    }
}

/// Decide where a navigation to `route` ends up for the given session.
pub fn guard(route: Route, session: &SessionSnapshot) -> Navigation {
    if route == Route::Home {
        return Navigation::Redirect(Route::Products);
    }

    let access = route.access();
    if access.requires_auth && !session.is_authenticated() {
        return Navigation::Redirect(Route::Login);
    }
    if access.requires_admin && !session.is_admin() {
        return Navigation::Redirect(Route::Products);
    }
    if access.requires_guest && session.is_authenticated() {
        return Navigation::Redirect(Route::Products);
    }
    Navigation::Allow(route)
}
