pub fn render_test_email(provider: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="font-family: sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
    <h2>Email integration test</h2>
    <p>This message was sent through your organization's <strong>{provider}</strong> configuration.</p>
    <p>If you can read it, candidates and interviewers will receive your emails.</p>
    <p style="color: #666; font-size: 14px;">You received this because an administrator tested the email settings.</p>
</body>
</html>"#
    )
}

pub fn render_test_email_text(provider: &str) -> String {
    format!(
        "This message was sent through your organization's {provider} configuration. \
         If you can read it, candidates and interviewers will receive your emails."
    )
}
