use maud::{Markup, html};

use super::{BUTTON, Chrome, INPUT, LABEL, error_list, format_ts, page};
use crate::{
    admin::MovieForm,
    catalog::{DashboardStats, MovieUsage},
    checkout::AdminOrderRow,
    entities::category,
    models::{OrderStatus, format_cents},
};

fn admin_nav() -> Markup {
    html! {
        div class="mb-8 flex gap-4 border-b border-gray-200 pb-3 text-sm" {
            a class="font-semibold text-gray-900 hover:text-red-600" href="/admin" { "Dashboard" }
            a class="text-gray-700 hover:text-red-600" href="/admin/movies/new" { "Add movie" }
            a class="text-gray-700 hover:text-red-600" href="/admin/categories" { "Categories" }
            a class="text-gray-700 hover:text-red-600" href="/admin/orders" { "Orders" }
        }
    }
}

fn stat(label: &str, value: String) -> Markup {
    html! {
        div class="bg-white shadow rounded-lg p-5" {
            p class="text-sm text-gray-500" { (label) }
            p class="mt-1 text-2xl font-bold text-gray-900" { (value) }
        }
    }
}

fn post_button(action: String, label: &str, class: &str) -> Markup {
    html! {
        form class="inline" method="post" action=(action) {
            button class=(class) type="submit" { (label) }
        }
    }
}

pub fn admin_dashboard_page(
    chrome: &Chrome,
    stats: &DashboardStats,
    movies: &[MovieUsage],
    recent: &[AdminOrderRow],
) -> String {
    page(
        chrome,
        "Admin",
        html! {
            (admin_nav())
            div class="grid gap-4 sm:grid-cols-3 lg:grid-cols-6" {
                (stat("Movies", stats.movies.to_string()))
                (stat("Active", stats.active_movies.to_string()))
                (stat("Categories", stats.categories.to_string()))
                (stat("Users", stats.users.to_string()))
                (stat("Orders", stats.orders.to_string()))
                (stat("Revenue", format!("${}", format_cents(stats.revenue_cents))))
            }

            section class="mt-10" {
                div class="flex items-center justify-between" {
                    h2 class="text-xl font-bold text-gray-900" { "Movies" }
                    a class=(BUTTON) href="/admin/movies/new" { "Add movie" }
                }
                table class="mt-4 w-full bg-white shadow rounded-lg text-sm" {
                    thead {
                        tr class="text-left text-gray-500" {
                            th class="p-3" { "Title" }
                            th class="p-3" { "Price" }
                            th class="p-3" { "Status" }
                            th class="p-3" { "Orders" }
                            th class="p-3" { "Watchlists" }
                            th class="p-3" {}
                        }
                    }
                    tbody class="divide-y divide-gray-200" {
                        @for row in movies {
                            tr {
                                td class="p-3" {
                                    a class="hover:text-red-600" href=(format!("/movies/{}", row.movie.id)) { (row.movie.title) }
                                }
                                td class="p-3" { "$" (format_cents(row.movie.price_cents)) }
                                td class="p-3" { (row.movie.status.label()) }
                                td class="p-3" { (row.order_count) }
                                td class="p-3" { (row.watchlist_count) }
                                td class="p-3 space-x-3 whitespace-nowrap" {
                                    a class="text-blue-600 hover:text-blue-800" href=(format!("/admin/movies/{}/edit", row.movie.id)) { "Edit" }
                                    (post_button(format!("/admin/movies/{}/toggle", row.movie.id), "Toggle", "text-gray-600 hover:text-gray-900"))
                                    (post_button(format!("/admin/movies/{}/delete", row.movie.id), "Delete", "text-red-600 hover:text-red-800"))
                                }
                            }
                        }
                    }
                }
            }

            section class="mt-10" {
                h2 class="text-xl font-bold text-gray-900" { "Recent orders" }
                (orders_table(recent, false))
            }
        },
    )
}

pub fn admin_movie_form_page(
    chrome: &Chrome,
    movie_id: Option<i32>,
    form: &MovieForm,
    categories: &[category::Model],
    errors: &[String],
) -> String {
    let (title, action) = match movie_id {
        Some(id) => ("Edit movie", format!("/admin/movies/{id}/edit")),
        None => ("Add movie", "/admin/movies/new".to_string()),
    };

    page(
        chrome,
        title,
        html! {
            (admin_nav())
            div class="max-w-3xl bg-white shadow rounded-lg p-8" {
                h1 class="text-2xl font-bold text-gray-900 mb-6" { (title) }
                (error_list(errors))
                form class="space-y-5" method="post" action=(action) enctype="multipart/form-data" {
                    div {
                        label class=(LABEL) for="title" { "Title" }
                        input class=(INPUT) id="title" name="title" value=(form.title) required;
                    }
                    div {
                        label class=(LABEL) for="description" { "Description" }
                        textarea class=(INPUT) id="description" name="description" rows="5" required { (form.description) }
                    }
                    div class="grid gap-4 sm:grid-cols-4" {
                        div {
                            label class=(LABEL) for="price" { "Price ($)" }
                            input class=(INPUT) id="price" name="price" inputmode="decimal" value=(form.price) required;
                        }
                        div {
                            label class=(LABEL) for="release_year" { "Release year" }
                            input class=(INPUT) id="release_year" name="release_year" type="number" value=(form.release_year) required;
                        }
                        div {
                            label class=(LABEL) for="duration" { "Duration (min)" }
                            input class=(INPUT) id="duration" name="duration" type="number" min="1" value=(form.duration) required;
                        }
                        div {
                            label class=(LABEL) for="rating" { "Rating" }
                            input class=(INPUT) id="rating" name="rating" type="number" step="0.1" min="0" max="10" value=(form.rating) required;
                        }
                    }
                    div {
                        label class=(LABEL) for="trailer_url" { "Trailer URL" }
                        input class=(INPUT) id="trailer_url" name="trailer_url" type="url" value=(form.trailer_url);
                    }
                    div class="grid gap-4 sm:grid-cols-2" {
                        div {
                            label class=(LABEL) for="poster" { "Poster image" }
                            input class="mt-1 text-sm" id="poster" name="poster" type="file" accept=".jpg,.jpeg,.png,.webp";
                        }
                        div {
                            label class=(LABEL) for="poster_url" { "or poster URL" }
                            input class=(INPUT) id="poster_url" name="poster_url" value=(form.poster_url);
                        }
                    }
                    @if !categories.is_empty() {
                        fieldset {
                            legend class=(LABEL) { "Categories" }
                            div class="mt-2 flex flex-wrap gap-4" {
                                @for c in categories {
                                    label class="flex items-center gap-2 text-sm" {
                                        input type="checkbox" name="categories" value=(c.id) checked[form.category_ids.contains(&c.id)];
                                        (c.name)
                                    }
                                }
                            }
                        }
                    }
                    label class="flex items-center gap-2 text-sm" {
                        input type="checkbox" name="status" value="active" checked[form.active];
                        "Active (visible in the store)"
                    }
                    button class=(BUTTON) type="submit" { "Save" }
                }
            }
        },
    )
}

pub fn admin_categories_page(chrome: &Chrome, categories: &[category::Model], errors: &[String]) -> String {
    page(
        chrome,
        "Categories",
        html! {
            (admin_nav())
            div class="grid gap-8 md:grid-cols-2" {
                div class="bg-white shadow rounded-lg p-6" {
                    h2 class="text-lg font-semibold text-gray-900 mb-4" { "Add category" }
                    (error_list(errors))
                    form class="space-y-4" method="post" action="/admin/categories" {
                        div {
                            label class=(LABEL) for="name" { "Name" }
                            input class=(INPUT) id="name" name="name" required;
                        }
                        div {
                            label class=(LABEL) for="description" { "Description" }
                            textarea class=(INPUT) id="description" name="description" rows="3" {}
                        }
                        button class=(BUTTON) type="submit" { "Add" }
                    }
                }
                ul class="divide-y divide-gray-200 bg-white shadow rounded-lg" {
                    @for c in categories {
                        li class="flex items-center justify-between p-4" {
                            div {
                                p class="font-medium text-gray-900" { (c.name) }
                                @if let Some(desc) = &c.description {
                                    p class="text-sm text-gray-500" { (desc) }
                                }
                            }
                            (post_button(format!("/admin/categories/{}/delete", c.id), "Delete", "text-sm text-red-600 hover:text-red-800"))
                        }
                    }
                }
            }
        },
    )
}

pub fn admin_orders_page(chrome: &Chrome, rows: &[AdminOrderRow]) -> String {
    page(
        chrome,
        "Orders",
        html! {
            (admin_nav())
            h1 class="text-2xl font-bold text-gray-900" { "Orders" }
            (orders_table(rows, true))
        },
    )
}

fn orders_table(rows: &[AdminOrderRow], editable: bool) -> Markup {
    html! {
        @if rows.is_empty() {
            p class="mt-4 text-gray-600" { "No orders yet." }
        } @else {
            table class="mt-4 w-full bg-white shadow rounded-lg text-sm" {
                thead {
                    tr class="text-left text-gray-500" {
                        th class="p-3" { "#" }
                        th class="p-3" { "Customer" }
                        th class="p-3" { "Placed" }
                        th class="p-3" { "Items" }
                        th class="p-3" { "Total" }
                        th class="p-3" { "Status" }
                    }
                }
                tbody class="divide-y divide-gray-200" {
                    @for row in rows {
                        tr {
                            td class="p-3" { (row.order.id) }
                            td class="p-3" { (row.username) }
                            td class="p-3" { (format_ts(row.order.created_at)) }
                            td class="p-3" { (row.item_count) }
                            td class="p-3" { "$" (format_cents(row.order.total_cents)) }
                            td class="p-3" {
                                @if editable {
                                    form class="flex gap-2" method="post" action=(format!("/admin/orders/{}/status", row.order.id)) {
                                        select class="rounded-md border border-gray-300 px-2 py-1" name="status" {
                                            @for status in OrderStatus::ALL {
                                                option value=(status.label()) selected[status == row.order.status] { (status.label()) }
                                            }
                                        }
                                        input class="rounded-md border border-gray-300 px-2 py-1" name="note" placeholder="Note";
                                        button class="text-blue-600 hover:text-blue-800" type="submit" { "Update" }
                                    }
                                } @else {
                                    span class=(format!("rounded-full px-3 py-1 text-xs {}", row.order.status.badge_class())) { (row.order.status.label()) }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}
