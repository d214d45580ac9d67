mod account;
mod admin;
mod shop;

pub use account::{login_page, profile_page, register_page};
pub use admin::{admin_categories_page, admin_dashboard_page, admin_movie_form_page, admin_orders_page};
pub use shop::{
    cart_page, checkout_page, home_page, movie_page, movies_page, order_page, orders_page,
    MovieView, search_page, watchlist_page,
};

use maud::{DOCTYPE, Markup, html};

use crate::{
    entities::movie,
    models::{Flash, FlashKind, format_cents},
    session::SessionUser,
};

const TAILWIND_CDN: &str = "https://cdn.tailwindcss.com";

/// Per-request bits every page shows in its header.
#[derive(Clone, Debug, Default)]
pub struct Chrome {
    pub site_name: String,
    pub user: Option<SessionUser>,
    pub cart_count: usize,
    pub flash: Option<Flash>,
}

pub fn error_page(message: &str) -> String {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { "Error" }
                script src=(TAILWIND_CDN) {}
            }
            body {
                div class="min-h-screen bg-gray-50 flex items-center justify-center" {
                    div class="max-w-xl w-full px-6" {
                        div class="bg-white shadow rounded-lg p-8" {
                            h1 class="text-2xl font-bold text-gray-900" { "Error" }
                            p class="mt-4 text-gray-700" { (message) }
                            a class="mt-6 inline-block text-red-600 hover:text-red-800" href="/" { "Back to the store" }
                        }
                    }
                }
            }
        }
    }
    .into_string()
}

fn page(chrome: &Chrome, title: &str, body: Markup) -> String {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) " · " (chrome.site_name) }
                script src=(TAILWIND_CDN) {}
            }
            body class="min-h-screen bg-gray-50" {
                (navbar(chrome))
                main class="max-w-6xl mx-auto px-6 py-8" {
                    @if let Some(flash) = &chrome.flash {
                        (flash_banner(flash))
                    }
                    (body)
                }
                footer class="border-t border-gray-200 py-6 text-center text-sm text-gray-500" {
                    (chrome.site_name)
                }
            }
        }
    }
    .into_string()
}

fn navbar(chrome: &Chrome) -> Markup {
    html! {
        nav class="bg-gray-900 text-white" {
            div class="max-w-6xl mx-auto px-6 py-4 flex items-center gap-6" {
                a class="text-xl font-bold text-red-500" href="/" { (chrome.site_name) }
                a class="text-sm hover:text-gray-300" href="/movies" { "Movies" }
                form class="flex-1" method="get" action="/search" {
                    input class="w-full max-w-sm rounded-md bg-gray-800 px-3 py-1.5 text-sm placeholder-gray-400 focus:outline-none" name="q" placeholder="Search movies";
                }
                a class="relative text-sm hover:text-gray-300" href="/cart" {
                    "Cart"
                    @if chrome.cart_count > 0 {
                        span class="ml-1 rounded-full bg-red-600 px-2 py-0.5 text-xs font-semibold" { (chrome.cart_count) }
                    }
                }
                @match &chrome.user {
                    Some(user) => {
                        a class="text-sm hover:text-gray-300" href="/watchlist" { "Watchlist" }
                        a class="text-sm hover:text-gray-300" href="/orders" { "Orders" }
                        a class="text-sm hover:text-gray-300" href="/profile" { "Profile" }
                        @if user.is_admin() {
                            a class="text-sm text-yellow-400 hover:text-yellow-300" href="/admin" { "Admin" }
                        }
                        form method="post" action="/logout" {
                            button class="text-sm text-gray-300 hover:text-white" type="submit" { "Log out " (user.username) }
                        }
                    },
                    None => {
                        a class="text-sm hover:text-gray-300" href="/login" { "Log in" }
                        a class="rounded-md bg-red-600 px-3 py-1.5 text-sm font-semibold hover:bg-red-700" href="/register" { "Sign up" }
                    },
                }
            }
        }
    }
}

fn flash_banner(flash: &Flash) -> Markup {
    let class = match flash.kind {
        FlashKind::Success => "border-green-200 bg-green-50 text-green-800",
        FlashKind::Info => "border-blue-200 bg-blue-50 text-blue-800",
        FlashKind::Error => "border-red-200 bg-red-50 text-red-800",
    };
    html! {
        div class=(format!("mb-6 rounded-md border px-4 py-3 text-sm {class}")) role="alert" {
            (flash.message)
        }
    }
}

fn error_list(errors: &[String]) -> Markup {
    html! {
        @if !errors.is_empty() {
            div class="mb-6 rounded-md border border-red-200 bg-red-50 px-4 py-3 text-sm text-red-800" {
                ul class="list-disc pl-5 space-y-1" {
                    @for err in errors {
                        li { (err) }
                    }
                }
            }
        }
    }
}

fn poster(m: &movie::Model, class: &str) -> Markup {
    html! {
        @match &m.poster_url {
            Some(url) => {
                img class=(class) src=(url) alt=(m.title);
            },
            None => {
                div class=(format!("{class} flex items-center justify-center bg-gray-200 text-gray-500")) { "No poster" }
            },
        }
    }
}

fn movie_card(m: &movie::Model) -> Markup {
    html! {
        a class="group block bg-white shadow rounded-lg overflow-hidden hover:shadow-lg" href=(format!("/movies/{}", m.id)) {
            (poster(m, "h-64 w-full object-cover"))
            div class="p-4" {
                h3 class="font-semibold text-gray-900 group-hover:text-red-600" { (m.title) }
                div class="mt-1 flex items-center justify-between text-sm text-gray-500" {
                    span { (m.release_year) " · ★ " (format!("{:.1}", m.rating)) }
                    span class="font-semibold text-gray-900" { "$" (format_cents(m.price_cents)) }
                }
            }
        }
    }
}

fn movie_grid(movies: &[movie::Model]) -> Markup {
    html! {
        div class="grid gap-6 sm:grid-cols-2 md:grid-cols-3 lg:grid-cols-4" {
            @for m in movies {
                (movie_card(m))
            }
        }
    }
}

fn format_ts(ts: i64) -> String {
    jiff::Timestamp::from_second(ts)
        .map(|t| t.strftime("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

const INPUT: &str = "mt-1 w-full rounded-md border border-gray-300 px-3 py-2 focus:border-red-500 focus:outline-none focus:ring-1 focus:ring-red-500";
const BUTTON: &str = "rounded-md bg-red-600 px-4 py-2 font-semibold text-white hover:bg-red-700";
const LABEL: &str = "block text-sm font-medium text-gray-700";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    #[test]
    fn navbar_shows_cart_badge_and_admin_link() {
        let chrome = Chrome {
            site_name: "StreamFlix".into(),
            user: Some(SessionUser { id: 1, username: "root".into(), role: Role::Admin }),
            cart_count: 2,
            flash: Some(Flash::success("Added to cart")),
        };
        let html = page(&chrome, "Home", html! { p { "body" } });
        assert!(html.contains("Home · StreamFlix"));
        assert!(html.contains(">2</span>"));
        assert!(html.contains("href=\"/admin\""));
        assert!(html.contains("Added to cart"));
    }

    #[test]
    fn markup_is_escaped() {
        let html = error_page("<script>alert(1)</script>");
        assert!(!html.contains("<script>alert"));
        assert!(html.contains("&lt;script&gt;"));
    }
}
