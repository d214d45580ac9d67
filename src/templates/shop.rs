use maud::{Markup, html};

use super::{BUTTON, Chrome, format_ts, movie_grid, page, poster};
use crate::{
    catalog::MovieSort,
    checkout::{OrderDetail, Quote},
    entities::{category, movie},
    models::{PaymentMethod, format_cents},
};

pub fn home_page(chrome: &Chrome, latest: &[movie::Model], top_rated: &[movie::Model]) -> String {
    page(
        chrome,
        "Home",
        html! {
            section class="rounded-lg bg-gray-900 px-8 py-12 text-white" {
                h1 class="text-4xl font-bold" { "Welcome to " (chrome.site_name) }
                p class="mt-3 text-gray-300" { "Buy and keep the movies you love." }
                a class=(format!("mt-6 inline-block {BUTTON}")) href="/movies" { "Browse the catalog" }
            }

            section class="mt-10" {
                h2 class="text-2xl font-bold text-gray-900 mb-4" { "Latest releases" }
                @if latest.is_empty() {
                    p class="text-gray-600" { "No movies yet." }
                } @else {
                    (movie_grid(latest))
                }
            }

            section class="mt-10" {
                h2 class="text-2xl font-bold text-gray-900 mb-4" { "Top rated" }
                (movie_grid(top_rated))
            }
        },
    )
}

pub fn movies_page(
    chrome: &Chrome,
    movies: &[movie::Model],
    categories: &[category::Model],
    selected: Option<i32>,
    sort: MovieSort,
) -> String {
    page(
        chrome,
        "Movies",
        html! {
            div class="flex flex-wrap items-end justify-between gap-4" {
                h1 class="text-3xl font-bold text-gray-900" { "Movies" }
                form class="flex items-end gap-3" method="get" action="/movies" {
                    select class="rounded-md border border-gray-300 px-3 py-2 text-sm" name="category" {
                        option value="" { "All categories" }
                        @for c in categories {
                            option value=(c.id) selected[selected == Some(c.id)] { (c.name) }
                        }
                    }
                    select class="rounded-md border border-gray-300 px-3 py-2 text-sm" name="sort" {
                        @for s in MovieSort::ALL {
                            option value=(s.as_code()) selected[s == sort] { (sort_label(s)) }
                        }
                    }
                    button class=(BUTTON) type="submit" { "Filter" }
                }
            }

            div class="mt-8" {
                @if movies.is_empty() {
                    p class="text-gray-600" { "No movies match." }
                } @else {
                    (movie_grid(movies))
                }
            }
        },
    )
}

fn sort_label(sort: MovieSort) -> &'static str {
    match sort {
        MovieSort::Newest => "Newest",
        MovieSort::Rating => "Top rated",
        MovieSort::Title => "Title A-Z",
        MovieSort::Price => "Price: low to high",
    }
}

pub struct MovieView<'a> {
    pub movie: &'a movie::Model,
    pub categories: &'a [category::Model],
    pub related: &'a [movie::Model],
    pub in_cart: bool,
    pub in_watchlist: bool,
}

pub fn movie_page(chrome: &Chrome, view: &MovieView<'_>) -> String {
    let m = view.movie;
    page(
        chrome,
        &m.title,
        html! {
            div class="grid gap-8 md:grid-cols-3" {
                div { (poster(m, "w-full rounded-lg shadow")) }
                div class="md:col-span-2" {
                    h1 class="text-4xl font-bold text-gray-900" { (m.title) }
                    p class="mt-2 text-gray-500" {
                        (m.release_year) " · " (m.duration) " min · ★ " (format!("{:.1}", m.rating))
                    }
                    @if !view.categories.is_empty() {
                        div class="mt-3 flex flex-wrap gap-2" {
                            @for c in view.categories {
                                a class="rounded-full bg-gray-200 px-3 py-1 text-xs text-gray-700 hover:bg-gray-300" href=(format!("/movies?category={}", c.id)) { (c.name) }
                            }
                        }
                    }
                    p class="mt-6 text-gray-700 whitespace-pre-line" { (m.description) }
                    p class="mt-6 text-3xl font-bold text-gray-900" { "$" (format_cents(m.price_cents)) }

                    div class="mt-6 flex flex-wrap gap-3" {
                        @if view.in_cart {
                            a class="rounded-md border border-gray-300 px-4 py-2 font-semibold text-gray-700" href="/cart" { "In your cart" }
                        } @else {
                            form method="post" action="/cart/add" {
                                input type="hidden" name="movie_id" value=(m.id);
                                button class=(BUTTON) type="submit" { "Add to cart" }
                            }
                        }
                        a class="rounded-md bg-gray-900 px-4 py-2 font-semibold text-white hover:bg-gray-700" href=(format!("/checkout?movie_id={}", m.id)) { "Buy now" }
                        form method="post" action="/watchlist" {
                            input type="hidden" name="movie_id" value=(m.id);
                            @if view.in_watchlist {
                                input type="hidden" name="action" value="remove";
                                button class="rounded-md border border-gray-300 px-4 py-2 text-gray-700 hover:bg-gray-100" type="submit" { "Remove from watchlist" }
                            } @else {
                                input type="hidden" name="action" value="add";
                                button class="rounded-md border border-gray-300 px-4 py-2 text-gray-700 hover:bg-gray-100" type="submit" { "Add to watchlist" }
                            }
                        }
                    }

                    @if let Some(trailer) = &m.trailer_url {
                        a class="mt-4 inline-block text-red-600 hover:text-red-800" href=(trailer) target="_blank" rel="noopener noreferrer" { "Watch trailer" }
                    }
                }
            }

            @if !view.related.is_empty() {
                section class="mt-12" {
                    h2 class="text-2xl font-bold text-gray-900 mb-4" { "You might also like" }
                    (movie_grid(view.related))
                }
            }
        },
    )
}

pub fn search_page(chrome: &Chrome, term: &str, results: &[movie::Model]) -> String {
    page(
        chrome,
        "Search",
        html! {
            h1 class="text-3xl font-bold text-gray-900" { "Search" }
            form class="mt-4 flex gap-3" method="get" action="/search" {
                input class="w-full max-w-md rounded-md border border-gray-300 px-3 py-2" name="q" value=(term) placeholder="Title or description";
                button class=(BUTTON) type="submit" { "Search" }
            }
            div class="mt-8" {
                @if term.trim().is_empty() {
                    p class="text-gray-600" { "Type something to search for." }
                } @else if results.is_empty() {
                    p class="text-gray-600" { "No movies found for \"" (term) "\"." }
                } @else {
                    p class="mb-4 text-sm text-gray-500" { (results.len()) " result(s) for \"" (term) "\"" }
                    (movie_grid(results))
                }
            }
        },
    )
}

fn totals(quote: &Quote, tax_rate_bps: u32) -> Markup {
    html! {
        dl class="space-y-2 text-sm" {
            div class="flex justify-between" {
                dt class="text-gray-600" { "Subtotal" }
                dd { "$" (format_cents(quote.subtotal_cents)) }
            }
            div class="flex justify-between" {
                dt class="text-gray-600" { "Tax (" (format_rate(tax_rate_bps)) ")" }
                dd { "$" (format_cents(quote.tax_cents)) }
            }
            div class="flex justify-between border-t border-gray-200 pt-2 text-base font-semibold" {
                dt { "Total" }
                dd { "$" (format_cents(quote.total_cents)) }
            }
        }
    }
}

fn format_rate(bps: u32) -> String {
    match bps % 100 {
        0 => format!("{}%", bps / 100),
        frac => format!("{}.{:02}%", bps / 100, frac),
    }
}

pub fn cart_page(chrome: &Chrome, quote: &Quote, tax_rate_bps: u32) -> String {
    page(
        chrome,
        "Cart",
        html! {
            h1 class="text-3xl font-bold text-gray-900" { "Your cart" }
            @if quote.lines.is_empty() {
                div class="mt-8 bg-white shadow rounded-lg p-8" {
                    p class="text-gray-600" { "Your cart is empty." }
                    a class="mt-4 inline-block text-red-600 hover:text-red-800" href="/movies" { "Browse movies" }
                }
            } @else {
                div class="mt-8 grid gap-8 md:grid-cols-3" {
                    ul class="md:col-span-2 divide-y divide-gray-200 bg-white shadow rounded-lg" {
                        @for line in &quote.lines {
                            li class="flex items-center justify-between p-4" {
                                a class="font-medium text-gray-900 hover:text-red-600" href=(format!("/movies/{}", line.movie_id)) { (line.title) }
                                div class="flex items-center gap-4" {
                                    span { "$" (format_cents(line.price_cents)) }
                                    form method="post" action="/cart/remove" {
                                        input type="hidden" name="movie_id" value=(line.movie_id);
                                        button class="text-sm text-gray-500 hover:text-red-600" type="submit" { "Remove" }
                                    }
                                }
                            }
                        }
                    }
                    div class="bg-white shadow rounded-lg p-6" {
                        (totals(quote, tax_rate_bps))
                        a class=(format!("mt-6 block text-center {BUTTON}")) href="/checkout" { "Proceed to checkout" }
                    }
                }
            }
        },
    )
}

pub fn checkout_page(chrome: &Chrome, quote: &Quote, tax_rate_bps: u32) -> String {
    page(
        chrome,
        "Checkout",
        html! {
            h1 class="text-3xl font-bold text-gray-900" { "Checkout" }
            div class="mt-8 grid gap-8 md:grid-cols-3" {
                div class="md:col-span-2 bg-white shadow rounded-lg p-6" {
                    h2 class="text-lg font-semibold text-gray-900" { "Order summary" }
                    ul class="mt-4 divide-y divide-gray-200" {
                        @for line in &quote.lines {
                            li class="flex justify-between py-3" {
                                span { (line.title) }
                                span { "$" (format_cents(line.price_cents)) }
                            }
                        }
                    }
                    @if !quote.missing.is_empty() {
                        p class="mt-4 text-sm text-gray-500" {
                            (quote.missing.len()) " item(s) in your cart are no longer available and will not be charged."
                        }
                    }
                }
                form class="bg-white shadow rounded-lg p-6" method="post" action="/checkout" {
                    (totals(quote, tax_rate_bps))
                    fieldset class="mt-6 space-y-2" {
                        legend class="text-sm font-medium text-gray-700" { "Payment method" }
                        @for (i, method) in PaymentMethod::ALL.into_iter().enumerate() {
                            label class="flex items-center gap-2 text-sm" {
                                input type="radio" name="payment_method" value=(method.as_code()) checked[i == 0];
                                (method.label())
                            }
                        }
                    }
                    button class=(format!("mt-6 w-full {BUTTON}")) type="submit" { "Place order" }
                }
            }
        },
    )
}

pub fn orders_page(chrome: &Chrome, orders: &[OrderDetail]) -> String {
    page(
        chrome,
        "Your orders",
        html! {
            h1 class="text-3xl font-bold text-gray-900" { "Your orders" }
            @if orders.is_empty() {
                p class="mt-8 text-gray-600" { "You have not bought anything yet." }
            } @else {
                div class="mt-8 space-y-4" {
                    @for detail in orders {
                        a class="block bg-white shadow rounded-lg p-6 hover:shadow-lg" href=(format!("/orders/{}", detail.order.id)) {
                            div class="flex items-center justify-between" {
                                span class="font-semibold text-gray-900" { "Order #" (detail.order.id) }
                                span class=(format!("rounded-full px-3 py-1 text-xs {}", detail.order.status.badge_class())) { (detail.order.status.label()) }
                            }
                            p class="mt-2 text-sm text-gray-500" {
                                (format_ts(detail.order.created_at)) " · " (detail.lines.len()) " item(s) · $" (format_cents(detail.order.total_cents))
                            }
                        }
                    }
                }
            }
        },
    )
}

pub fn order_page(chrome: &Chrome, detail: &OrderDetail, just_placed: bool) -> String {
    let order = &detail.order;
    let method = PaymentMethod::from_code(&order.payment_method)
        .map_or(order.payment_method.as_str(), |m| m.label());
    page(
        chrome,
        &format!("Order #{}", order.id),
        html! {
            @if just_placed {
                div class="mb-6 rounded-lg bg-green-50 p-6 text-green-800" {
                    h1 class="text-2xl font-bold" { "Thank you for your purchase!" }
                    p class="mt-1" { "Your movies are ready to watch." }
                }
            }
            div class="bg-white shadow rounded-lg p-6" {
                div class="flex items-center justify-between" {
                    h2 class="text-xl font-semibold text-gray-900" { "Order #" (order.id) }
                    span class=(format!("rounded-full px-3 py-1 text-xs {}", order.status.badge_class())) { (order.status.label()) }
                }
                p class="mt-1 text-sm text-gray-500" { "Placed " (format_ts(order.created_at)) " · paid with " (method) }
                table class="mt-6 w-full text-sm" {
                    thead {
                        tr class="text-left text-gray-500" {
                            th class="py-2" { "Movie" }
                            th class="py-2 text-right" { "Price" }
                        }
                    }
                    tbody class="divide-y divide-gray-200" {
                        @for line in &detail.lines {
                            tr {
                                td class="py-2" {
                                    a class="hover:text-red-600" href=(format!("/movies/{}", line.movie_id)) { (line.title) }
                                }
                                td class="py-2 text-right" { "$" (format_cents(line.price_cents * i64::from(line.quantity))) }
                            }
                        }
                    }
                }
                dl class="mt-6 space-y-1 text-sm" {
                    div class="flex justify-between" { dt { "Subtotal" } dd { "$" (format_cents(order.subtotal_cents)) } }
                    div class="flex justify-between" { dt { "Tax" } dd { "$" (format_cents(order.tax_cents)) } }
                    div class="flex justify-between font-semibold" { dt { "Total" } dd { "$" (format_cents(order.total_cents)) } }
                }
            }
            a class="mt-6 inline-block text-red-600 hover:text-red-800" href="/orders" { "All orders" }
        },
    )
}

pub fn watchlist_page(chrome: &Chrome, entries: &[(movie::Model, i64)]) -> String {
    page(
        chrome,
        "Watchlist",
        html! {
            h1 class="text-3xl font-bold text-gray-900" { "Your watchlist" }
            @if entries.is_empty() {
                p class="mt-8 text-gray-600" { "Nothing saved yet." }
            } @else {
                ul class="mt-8 divide-y divide-gray-200 bg-white shadow rounded-lg" {
                    @for (m, added_at) in entries {
                        li class="flex items-center gap-4 p-4" {
                            (poster(m, "h-20 w-14 rounded object-cover"))
                            div class="flex-1" {
                                a class="font-medium text-gray-900 hover:text-red-600" href=(format!("/movies/{}", m.id)) { (m.title) }
                                p class="text-sm text-gray-500" { "Added " (format_ts(*added_at)) " · $" (format_cents(m.price_cents)) }
                            }
                            form method="post" action="/cart/add" {
                                input type="hidden" name="movie_id" value=(m.id);
                                button class="text-sm text-red-600 hover:text-red-800" type="submit" { "Add to cart" }
                            }
                            form method="post" action="/watchlist" {
                                input type="hidden" name="movie_id" value=(m.id);
                                input type="hidden" name="action" value="remove";
                                button class="text-sm text-gray-500 hover:text-red-600" type="submit" { "Remove" }
                            }
                        }
                    }
                }
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkout::CheckoutLine;

    #[test]
    fn tax_rate_labels() {
        assert_eq!(format_rate(700), "7%");
        assert_eq!(format_rate(825), "8.25%");
        assert_eq!(format_rate(0), "0%");
    }

    #[test]
    fn checkout_summary_shows_quote_totals() {
        let quote = Quote {
            lines: vec![
                CheckoutLine { movie_id: 1, title: "Movie A".into(), price_cents: 999 },
                CheckoutLine { movie_id: 2, title: "Movie B".into(), price_cents: 1499 },
            ],
            missing: vec![],
            subtotal_cents: 2498,
            tax_cents: 175,
            total_cents: 2673,
        };
        let html = checkout_page(&Chrome::default(), &quote, 700);
        assert!(html.contains("$24.98"));
        assert!(html.contains("$1.75"));
        assert!(html.contains("$26.73"));
        assert!(html.contains("value=\"apple_pay\""));
    }
}
