use anyhow::Result;
use handlebars::Handlebars;
use serde::Serialize;
use serde_json::json;

pub const APP_NAME: &str = "FastTix";

#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    handlebars: Handlebars<'static>,
}

impl TemplateRenderer {
    pub fn new() -> Result<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);

        handlebars.register_template_string("layout", LAYOUT)?;
        handlebars.register_template_string("email_verification", EMAIL_VERIFICATION_TEMPLATE)?;
        handlebars.register_template_string("password_reset", PASSWORD_RESET_TEMPLATE)?;
        handlebars.register_template_string("submission_received", SUBMISSION_RECEIVED_TEMPLATE)?;
        handlebars.register_template_string("payment_link", PAYMENT_LINK_TEMPLATE)?;
        handlebars.register_template_string("submission_decision", SUBMISSION_DECISION_TEMPLATE)?;
        handlebars.register_template_string("payment_success", PAYMENT_SUCCESS_TEMPLATE)?;
        handlebars.register_template_string("ticket", TICKET_TEMPLATE)?;

        Ok(Self { handlebars })
    }

    /// Renders `template_name` and wraps it in the shared layout.
    pub fn render<T: Serialize>(&self, template_name: &str, subject: &str, data: &T) -> Result<String> {
        let body = self.handlebars.render(template_name, data)?;
        let page = self.handlebars.render(
            "layout",
            &json!({
                "app_name": APP_NAME,
                "subject": subject,
                "body": body,
            }),
        )?;
        Ok(page)
    }
}

const LAYOUT: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{{subject}} - {{app_name}}</title>
    <style>
        body { font-family: Arial, sans-serif; line-height: 1.6; color: #333; margin: 0; padding: 0; }
        .container { max-width: 600px; margin: 0 auto; padding: 20px; }
        .header { background: linear-gradient(135deg, #f97316 0%, #db2777 100%); color: white; padding: 30px; text-align: center; border-radius: 10px 10px 0 0; }
        .content { background: white; padding: 30px; border: 1px solid #ddd; }
        .footer { background: #f8f9fa; padding: 20px; text-align: center; font-size: 12px; color: #666; border-radius: 0 0 10px 10px; }
        .button { display: inline-block; padding: 12px 24px; background: #f97316; color: white; text-decoration: none; border-radius: 5px; font-weight: bold; margin: 20px 0; }
        .details td { padding: 4px 12px 4px 0; }
        .link { background: #f8f9fa; padding: 10px; border-radius: 5px; word-break: break-all; }
    </style>
</head>
<body>
    <div class="container">
        <div class="header">
            <h1>{{app_name}}</h1>
            <p>{{subject}}</p>
        </div>
        <div class="content">
            {{{body}}}
        </div>
        <div class="footer">
            <p>&copy; {{app_name}}. All rights reserved.</p>
        </div>
    </div>
</body>
</html>
"#;

const EMAIL_VERIFICATION_TEMPLATE: &str = r#"
<h2>Welcome, {{full_name}}!</h2>
<p>Thanks for signing up. Please confirm your email address to start buying and selling tickets.</p>
<div style="text-align: center;">
    <a href="{{verification_url}}" class="button">Verify Email Address</a>
</div>
<p>Or copy and paste this link into your browser:</p>
<p class="link">{{verification_url}}</p>
<p>If you didn't create an account, you can ignore this email.</p>
"#;

const PASSWORD_RESET_TEMPLATE: &str = r#"
<h2>Hi {{full_name}},</h2>
<p>We received a request to reset your password.</p>
<div style="text-align: center;">
    <a href="{{reset_url}}" class="button">Reset Password</a>
</div>
<p class="link">{{reset_url}}</p>
<p>This link expires in 24 hours. If you didn't request a reset, ignore this email.</p>
"#;

const SUBMISSION_RECEIVED_TEMPLATE: &str = r#"
<h2>Hi {{full_name}},</h2>
<p>Your event <strong>{{product_name}}</strong> has been submitted and is waiting for review.</p>
<p>We'll email you as soon as an administrator has approved or rejected it.</p>
"#;

const PAYMENT_LINK_TEMPLATE: &str = r#"
<h2>Hi {{full_name}},</h2>
<p>Please complete the payment for <strong>{{item_name}}</strong>.</p>
<table class="details">
    <tr><td>Order</td><td>{{order_id}}</td></tr>
    <tr><td>Amount</td><td>Rp {{amount}}</td></tr>
</table>
<div style="text-align: center;">
    <a href="{{payment_url}}" class="button">Pay Now</a>
</div>
<p class="link">{{payment_url}}</p>
"#;

const SUBMISSION_DECISION_TEMPLATE: &str = r#"
<h2>Hi {{full_name}},</h2>
{{#if accepted}}
<p>Good news! Your event <strong>{{product_name}}</strong> has been approved and is now on sale.</p>
{{else}}
<p>Unfortunately your event <strong>{{product_name}}</strong> was not approved.</p>
{{/if}}
"#;

const PAYMENT_SUCCESS_TEMPLATE: &str = r#"
<h2>Hi {{full_name}},</h2>
<p>We've received your payment for order <strong>{{order_id}}</strong>.</p>
<table class="details">
    <tr><td>Event</td><td>{{product_name}}</td></tr>
    <tr><td>Quantity</td><td>{{quantity}}</td></tr>
    <tr><td>Total</td><td>Rp {{amount}}</td></tr>
</table>
<p>Your ticket is on its way in a separate email.</p>
"#;

const TICKET_TEMPLATE: &str = r#"
<h2>Your ticket for {{product_name}}</h2>
<table class="details">
    <tr><td>Date</td><td>{{event_date}}</td></tr>
    <tr><td>Time</td><td>{{event_time}}</td></tr>
    <tr><td>Venue</td><td>{{address}}</td></tr>
    <tr><td>Quantity</td><td>{{quantity}}</td></tr>
    <tr><td>Order</td><td>{{order_id}}</td></tr>
</table>
<p>Show this code at the entrance:</p>
<div style="text-align: center;">
    <img src="cid:{{qr_content_id}}" alt="Ticket QR code" width="240" height="240">
</div>
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_inside_layout() {
        let renderer = TemplateRenderer::new().unwrap();
        let html = renderer
            .render(
                "submission_decision",
                "Submission approved",
                &json!({ "full_name": "Budi", "product_name": "Jazz Night", "accepted": true }),
            )
            .unwrap();

        assert!(html.contains("<title>Submission approved - FastTix</title>"));
        assert!(html.contains("has been approved"));
        assert!(!html.contains("was not approved"));
    }

    #[test]
    fn missing_fields_are_errors() {
        let renderer = TemplateRenderer::new().unwrap();
        assert!(renderer
            .render("payment_link", "Payment", &json!({ "full_name": "Budi" }))
            .is_err());
    }
}
