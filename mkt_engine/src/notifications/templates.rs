use crate::{
    db_types::Role,
    events::{
        Contacts,
        OrderEvent,
        OrderEventKind,
        Party,
        PaymentEvent,
        PaymentEventKind,
        PayoutEvent,
        PayoutEventKind,
    },
    notifications::EmailMessage,
};

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}

fn message(to: &Party, subject: String, lines: &[String]) -> EmailMessage {
    let text = format!("Hi {},\n\n{}\n", to.name, lines.join("\n"));
    let body = lines.iter().map(|l| format!("<p>{}</p>", escape_html(l))).collect::<String>();
    let html = format!("<p>Hi {},</p>{body}", escape_html(&to.name));
    EmailMessage { recipient: to.email.clone(), subject, html, text }
}

fn to_customer(contacts: &Contacts, subject: &str, lines: &[String]) -> Option<EmailMessage> {
    contacts.customer.as_ref().map(|c| message(c, subject.to_string(), lines))
}

fn to_vendor(contacts: &Contacts, subject: &str, lines: &[String]) -> Option<EmailMessage> {
    contacts.vendor.as_ref().map(|v| message(v, subject.to_string(), lines))
}

/// The parties who did not trigger the change.
fn counterparts(contacts: &Contacts, by: Role, subject: &str, lines: &[String]) -> Vec<EmailMessage> {
    match by {
        Role::Customer => to_vendor(contacts, subject, lines).into_iter().collect(),
        Role::Vendor => to_customer(contacts, subject, lines).into_iter().collect(),
        Role::Admin | Role::SuperAdmin => {
            to_customer(contacts, subject, lines).into_iter().chain(to_vendor(contacts, subject, lines)).collect()
        },
    }
}

pub fn order_messages(ev: &OrderEvent) -> Vec<EmailMessage> {
    let o = &ev.order;
    let n = &o.order_number;
    let schedule = format!("{} at {}", o.scheduled_date.date_naive(), o.scheduled_time);
    let c = &ev.contacts;
    match &ev.kind {
        OrderEventKind::Created => {
            let customer = to_customer(c, &format!("Booking {n} received"), &[
                format!("Your booking for {} on {schedule} has been received.", o.service_name),
                format!("Total: {} {}", o.total_amount, o.currency),
            ]);
            let vendor = to_vendor(c, &format!("New booking {n}"), &[
                format!("You have a new booking for {} on {schedule}.", o.service_name),
                "Please accept or reject it.".to_string(),
            ]);
            customer.into_iter().chain(vendor).collect()
        },
        OrderEventKind::Accepted => to_customer(c, &format!("Booking {n} accepted"), &[format!(
            "Your booking for {} on {schedule} was accepted. You can now pay for it.",
            o.service_name
        )])
        .into_iter()
        .collect(),
        OrderEventKind::Rejected => to_customer(c, &format!("Booking {n} was declined"), &[format!(
            "Reason: {}",
            o.rejection_reason.as_deref().unwrap_or("not given")
        )])
        .into_iter()
        .collect(),
        OrderEventKind::Started => {
            let lines = [format!("Work on {} has started.", o.service_name)];
            to_customer(c, &format!("Booking {n} is in progress"), &lines).into_iter().collect()
        },
        OrderEventKind::Completed => to_customer(c, &format!("Booking {n} completed"), &[format!(
            "{} has been completed. Thank you for booking with us.",
            o.service_name
        )])
        .into_iter()
        .collect(),
        OrderEventKind::Cancelled { by } => counterparts(c, *by, &format!("Booking {n} cancelled"), &[
            format!("The booking for {} on {schedule} was cancelled by the {by}.", o.service_name),
            format!("Reason: {}", o.cancellation_reason.as_deref().unwrap_or("not given")),
        ]),
        OrderEventKind::Rescheduled { by } => counterparts(c, *by, &format!("Booking {n} rescheduled"), &[
            format!("The booking for {} was moved to {schedule}.", o.service_name),
            format!("Reason: {}", o.reschedule_reason.as_deref().unwrap_or("not given")),
        ]),
        OrderEventKind::CouponApplied => vec![],
    }
}

pub fn payment_messages(ev: &PaymentEvent) -> Vec<EmailMessage> {
    let t = &ev.transaction;
    let n = &ev.order_number;
    let c = &ev.contacts;
    match &ev.kind {
        PaymentEventKind::Settled => {
            let customer = to_customer(c, &format!("Payment received for {n}"), &[
                format!("We received your payment of {} {}.", t.amount, t.currency),
                format!("Transaction: {}", t.transaction_number),
            ]);
            let vendor = to_vendor(c, &format!("Booking {n} has been paid"), &[format!(
                "The customer paid {} {}. Your share is {} {}.",
                t.amount, t.currency, t.vendor_amount, t.currency
            )]);
            customer.into_iter().chain(vendor).collect()
        },
        PaymentEventKind::Failed { reason } => to_customer(c, &format!("Payment for {n} failed"), &[
            format!("Your payment of {} {} did not go through.", t.amount, t.currency),
            format!("Reason: {reason}"),
        ])
        .into_iter()
        .collect(),
        PaymentEventKind::Refunded { amount } => {
            let lines = [format!("{amount} {} of transaction {} has been refunded.", t.currency, t.transaction_number)];
            let subject = format!("Refund for {n}");
            to_customer(c, &subject, &lines).into_iter().chain(to_vendor(c, &subject, &lines)).collect()
        },
    }
}

pub fn payout_messages(ev: &PayoutEvent) -> Vec<EmailMessage> {
    let Some(vendor) = &ev.vendor else {
        return vec![];
    };
    let p = &ev.payout;
    let (subject, line) = match ev.kind {
        PayoutEventKind::Requested => (
            format!("Payout #{} requested", p.id),
            format!("Your payout of {} covering {} transactions is awaiting review.", p.amount, p.transaction_count),
        ),
        PayoutEventKind::Approved => {
            (format!("Payout #{} approved", p.id), format!("Your payout of {} is being processed.", p.amount))
        },
        PayoutEventKind::Rejected => (
            format!("Payout #{} rejected", p.id),
            format!(
                "Your payout of {} was rejected. The transactions are available for a new request. {}",
                p.amount,
                p.admin_notes.as_deref().unwrap_or_default()
            ),
        ),
        PayoutEventKind::Completed => (
            format!("Payout #{} sent", p.id),
            format!("{} has been sent. Reference: {}", p.amount, p.gateway_reference.as_deref().unwrap_or("n/a")),
        ),
    };
    vec![message(vendor, subject, &[line])]
}
