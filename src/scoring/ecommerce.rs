//! Marketplace listing and order heuristics

use super::{money, Tally};
use crate::types::FraudRequest;

const HIGH_RISK_PAYMENTS: &[&str] = &["crypto", "gift_card", "prepaid", "other"];
const LOW_RISK_SHIPPING: &[&str] = &["united states", "canada", "united kingdom", "germany", "france"];
const NEGATIVE_REVIEW_WORDS: &[&str] = &["negative", "bad", "poor", "terrible", "scam", "fake", "fraud"];

pub(super) fn score(req: &FraudRequest, tally: &mut Tally) {
    let seller_age = req.number("seller_age_days");
    if let Some(age) = seller_age {
        let days = age.max(0.0) as u64;
        if age < 1.0 {
            tally.add("brand_new_seller", 45.0, "seller account opened less than a day ago");
        } else if age < 7.0 {
            tally.add("new_seller", 40.0, format!("seller account only {days} days old"));
        } else if age < 30.0 {
            tally.add("young_seller", 25.0, format!("seller account only {days} days old"));
        } else if age < 90.0 {
            tally.add("recent_seller", 10.0, format!("seller account less than 90 days old ({days} days)"));
        } else if age >= 730.0 {
            tally.add("established_seller", -10.0, format!("established seller ({days} days)"));
        }
    }

    price_risk(req, tally);

    let shipping = req.text("shipping_address");
    let billing = req.text("billing_address");
    if let (Some(shipping), Some(billing)) = (shipping, billing) {
        if shipping.replace(' ', "") != billing.replace(' ', "") {
            tally.add("address_mismatch", 30.0, "shipping address differs from billing address");
        } else {
            tally.add("address_match", -5.0, "shipping and billing addresses match");
        }
    }

    if let Some(method) = req.text("payment_method") {
        if HIGH_RISK_PAYMENTS.iter().any(|m| method.contains(m)) {
            tally.add("high_risk_payment", 20.0, format!("high-risk payment method ({method})"));
        } else if method == "credit_card" || method == "debit_card" {
            tally.add("card_payment", -5.0, "standard card payment");
        }
    }

    match req.text("ip_address") {
        Some(ip) if ip.contains("vpn") || ip.contains("tor") || ip.contains("proxy") => {
            tally.add("anonymized_network", 25.0, "order placed through VPN, TOR or proxy")
        }
        Some(ip) if ip.contains("unknown") => tally.add("unknown_network", 10.0, "unidentifiable network origin"),
        _ => {}
    }

    match req.flag("email_verified") {
        Some(false) => tally.add("unverified_email", 15.0, "buyer email not verified"),
        Some(true) => tally.add("verified_email", -5.0, "buyer email verified"),
        None => {}
    }

    review_risk(req, tally);

    if req.flag("seller_verified") == Some(false) && seller_age.is_some_and(|a| a < 30.0) {
        tally.add("unverified_new_seller", 15.0, "new seller without identity verification");
    }

    if let Some(ships_from) = req.get("shipping_location").map(|_| req.text("shipping_location")) {
        match ships_from {
            None => tally.add("unclear_shipping_origin", 25.0, "unclear shipping origin"),
            Some(s) if s.contains("unknown") => tally.add("unclear_shipping_origin", 25.0, "unclear shipping origin"),
            Some(s) if LOW_RISK_SHIPPING.contains(&s.as_str()) => {
                tally.add("trusted_shipping_origin", -5.0, format!("ships from {s}"))
            }
            Some(_) => {}
        }
    }

    let description = req.text("description").or_else(|| req.text("product_details"));
    if let Some(text) = description {
        if text.contains("stock photo") || text.contains("vague") || text.chars().count() < 20 {
            tally.add("thin_listing", 15.0, "vague product description or stock photos");
        } else if text.contains("authentic") || text.contains("verified") {
            tally.add("detailed_listing", -5.0, "detailed listing with authenticity information");
        }
    }
}

fn price_risk(req: &FraudRequest, tally: &mut Tally) {
    let (Some(price), Some(market)) = (
        req.number_any(&["price", "listed_price"]),
        req.number("market_price"),
    ) else {
        return;
    };
    if market <= 0.0 || price < 0.0 {
        return;
    }

    let ratio = price / market;
    let discount = (market - price) / market * 100.0;
    let markup_clause = format!("listed at {} against a market price of {} ({ratio:.1}x)", money(price), money(market));

    if ratio > 10.0 {
        tally.add("extreme_markup", 60.0, markup_clause);
    } else if ratio > 5.0 {
        tally.add("high_markup", 45.0, markup_clause);
    } else if ratio > 2.0 {
        tally.add("suspicious_markup", 30.0, markup_clause);
    } else if discount > 70.0 {
        tally.add("too_good_to_be_true", 50.0, format!("price {discount:.0}% below market value"));
    } else if discount > 50.0 {
        tally.add("deep_discount", 40.0, format!("price {discount:.0}% below market value"));
    } else if discount > 30.0 {
        tally.add("steep_discount", 25.0, format!("price {discount:.0}% below market value"));
    } else if (0.9..=1.1).contains(&ratio) {
        tally.add("market_price", -5.0, "price in line with market value");
    }
}

fn review_risk(req: &FraudRequest, tally: &mut Tally) {
    let Some(reviews) = req.items("reviews") else {
        return;
    };
    let reviews: Vec<String> = reviews
        .into_iter()
        .map(|r| r.to_lowercase())
        .filter(|r| r != "none")
        .collect();

    match reviews.len() {
        0 => {
            tally.add("no_reviews", 20.0, "no customer reviews");
            return;
        }
        n if n < 5 => tally.add("few_reviews", 10.0, format!("only {n} customer reviews")),
        _ => {}
    }

    let negative = reviews
        .iter()
        .filter(|r| NEGATIVE_REVIEW_WORDS.iter().any(|w| r.contains(w)))
        .count();
    if negative > 0 {
        tally.add(
            "negative_reviews",
            (15.0 * negative as f64).min(40.0),
            format!("{negative} negative review(s)"),
        );
    }

    if reviews.iter().take(5).all(|r| r.contains("excellent") || r.contains('5')) {
        tally.add("suspiciously_perfect_reviews", 30.0, "uniformly perfect reviews suggest fabrication");
    }
}
