use maud::html;

use super::{BUTTON, Chrome, INPUT, LABEL, error_list, format_ts, page};
use crate::{
    accounts::{ProfileForm, RegisterForm},
    checkout::OrderDetail,
    entities::user,
    models::format_cents,
};

pub fn login_page(chrome: &Chrome, login: &str, redirect: &str, error: Option<&str>) -> String {
    page(
        chrome,
        "Log in",
        html! {
            div class="max-w-md mx-auto bg-white shadow rounded-lg p-8" {
                h1 class="text-2xl font-bold text-gray-900" { "Log in" }
                @if let Some(error) = error {
                    p class="mt-4 rounded-md bg-red-50 px-4 py-3 text-sm text-red-800" { (error) }
                }
                form class="mt-6 space-y-4" method="post" action="/login" {
                    input type="hidden" name="redirect" value=(redirect);
                    div {
                        label class=(LABEL) for="login" { "Username or email" }
                        input class=(INPUT) id="login" name="login" value=(login) required autofocus;
                    }
                    div {
                        label class=(LABEL) for="password" { "Password" }
                        input class=(INPUT) id="password" name="password" type="password" required;
                    }
                    button class=(format!("w-full {BUTTON}")) type="submit" { "Log in" }
                }
                p class="mt-6 text-sm text-gray-600" {
                    "New here? "
                    a class="text-red-600 hover:text-red-800" href="/register" { "Create an account" }
                }
            }
        },
    )
}

pub fn register_page(chrome: &Chrome, form: &RegisterForm, errors: &[String]) -> String {
    page(
        chrome,
        "Sign up",
        html! {
            div class="max-w-md mx-auto bg-white shadow rounded-lg p-8" {
                h1 class="text-2xl font-bold text-gray-900 mb-6" { "Create an account" }
                (error_list(errors))
                form class="space-y-4" method="post" action="/register" {
                    div {
                        label class=(LABEL) for="username" { "Username" }
                        input class=(INPUT) id="username" name="username" value=(form.username) minlength="3" maxlength="50" required;
                    }
                    div {
                        label class=(LABEL) for="email" { "Email" }
                        input class=(INPUT) id="email" name="email" type="email" value=(form.email) required;
                    }
                    div {
                        label class=(LABEL) for="password" { "Password" }
                        input class=(INPUT) id="password" name="password" type="password" minlength="6" required;
                    }
                    div {
                        label class=(LABEL) for="confirm_password" { "Confirm password" }
                        input class=(INPUT) id="confirm_password" name="confirm_password" type="password" required;
                    }
                    button class=(format!("w-full {BUTTON}")) type="submit" { "Sign up" }
                }
                p class="mt-6 text-sm text-gray-600" {
                    "Already registered? "
                    a class="text-red-600 hover:text-red-800" href="/login" { "Log in" }
                }
            }
        },
    )
}

pub fn profile_page(
    chrome: &Chrome,
    account: &user::Model,
    form: &ProfileForm,
    orders: &[OrderDetail],
    errors: &[String],
) -> String {
    page(
        chrome,
        "My profile",
        html! {
            div class="mb-8" {
                h1 class="text-3xl font-bold text-gray-900" { (account.username) }
                p class="mt-1 text-sm text-gray-500" { "Member since " (format_ts(account.created_at)) }
            }
            div class="grid gap-8 md:grid-cols-2" {
                div class="bg-white shadow rounded-lg p-6" {
                    h2 class="text-lg font-semibold text-gray-900 mb-4" { "Personal information" }
                    (error_list(errors))
                    form class="space-y-4" method="post" action="/profile" {
                        div class="grid gap-4 sm:grid-cols-2" {
                            div {
                                label class=(LABEL) for="first_name" { "First name" }
                                input class=(INPUT) id="first_name" name="first_name" value=(form.first_name) maxlength="50";
                            }
                            div {
                                label class=(LABEL) for="last_name" { "Last name" }
                                input class=(INPUT) id="last_name" name="last_name" value=(form.last_name) maxlength="50";
                            }
                        }
                        div {
                            label class=(LABEL) for="email" { "Email" }
                            input class=(INPUT) id="email" name="email" type="email" value=(form.email) required;
                        }
                        div {
                            label class=(LABEL) for="phone" { "Phone" }
                            input class=(INPUT) id="phone" name="phone" type="tel" value=(form.phone);
                        }
                        div {
                            label class=(LABEL) for="address" { "Address" }
                            textarea class=(INPUT) id="address" name="address" rows="3" { (form.address) }
                        }
                        div class="grid gap-4 sm:grid-cols-2" {
                            div {
                                label class=(LABEL) for="password" { "New password" }
                                input class=(INPUT) id="password" name="password" type="password" placeholder="Leave blank to keep";
                            }
                            div {
                                label class=(LABEL) for="confirm_password" { "Confirm password" }
                                input class=(INPUT) id="confirm_password" name="confirm_password" type="password";
                            }
                        }
                        button class=(BUTTON) type="submit" { "Update profile" }
                    }
                }
                div class="bg-white shadow rounded-lg p-6" {
                    h2 class="text-lg font-semibold text-gray-900 mb-4" { "Your orders" }
                    @if orders.is_empty() {
                        p class="text-sm text-gray-600" { "No orders yet." }
                    } @else {
                        ul class="divide-y divide-gray-100" {
                            @for detail in orders {
                                li class="py-3 flex items-center justify-between text-sm" {
                                    a class="font-medium text-red-600 hover:text-red-800" href=(format!("/orders/{}", detail.order.id)) {
                                        "Order #" (detail.order.id)
                                    }
                                    span class="text-gray-500" {
                                        (format_ts(detail.order.created_at)) " · " (detail.lines.len()) " item(s) · $" (format_cents(detail.order.total_cents))
                                    }
                                }
                            }
                        }
                    }
                }
            }
        },
    )
}
