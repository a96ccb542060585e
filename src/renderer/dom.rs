//! DOM queries over a loaded HTML document
//!
//! Parsed documents are not `Send`, so every helper here parses, queries and
//! returns owned data without holding the document across an await point.

use crate::renderer::RenderError;
use crate::url::resolve_link;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// What a click on an element does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickAction {
    /// Navigate to a link target
    Follow(Url),
    /// Submit a form
    Submit(FormSubmission),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMethod {
    Get,
    Post,
}

/// A form ready to be sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSubmission {
    pub method: FormMethod,
    pub action: Url,
    pub fields: Vec<(String, String)>,
}

pub fn parse_selector(selector: &str) -> Result<Selector, RenderError> {
    Selector::parse(selector).map_err(|e| RenderError::InvalidSelector {
        selector: selector.to_string(),
        reason: format!("{:?}", e),
    })
}

/// Returns true if `selector` matches at least one element
pub fn matches_selector(html: &str, selector: &str) -> Result<bool, RenderError> {
    let selector = parse_selector(selector)?;
    let document = Html::parse_document(html);
    let found = document.select(&selector).next().is_some();
    Ok(found)
}

/// Extracts anchor targets as absolute URLs
///
/// Every `a[href]` is followed, including `download` anchors; only
/// non-navigable schemes and fragment-only links are skipped.
pub fn anchor_hrefs(html: &str, base_url: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if let Some(href) = element.value().attr("href") {
                if let Some(absolute_url) = resolve_link(href, base_url) {
                    links.push(absolute_url.to_string());
                }
            }
        }
    }

    links
}

/// Extracts image, stylesheet and script references as absolute URLs
pub fn asset_refs(html: &str, base_url: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut refs = Vec::new();

    for (css, attr) in [
        ("img[src]", "src"),
        ("link[rel~='stylesheet'][href]", "href"),
        ("script[src]", "src"),
    ] {
        let Ok(selector) = Selector::parse(css) else {
            continue;
        };
        for element in document.select(&selector) {
            if let Some(value) = element.value().attr(attr) {
                if let Some(absolute_url) = resolve_link(value, base_url) {
                    refs.push(absolute_url.to_string());
                }
            }
        }
    }

    refs
}

/// Returns the submission name of the form control matched by `selector`
pub fn control_name(html: &str, selector: &str) -> Result<String, RenderError> {
    let parsed = parse_selector(selector)?;
    let document = Html::parse_document(html);
    let element = document
        .select(&parsed)
        .next()
        .ok_or_else(|| RenderError::ElementNotFound(selector.to_string()))?;

    let is_control = matches!(element.value().name(), "input" | "textarea" | "select");
    match (is_control, element.value().attr("name")) {
        (true, Some(name)) if !name.is_empty() => Ok(name.to_string()),
        _ => Err(RenderError::NotInteractive {
            selector: selector.to_string(),
            action: "filled",
        }),
    }
}

/// Works out what clicking the element matched by `selector` does
///
/// `filled` holds values typed into named controls; they override the
/// defaults present in the markup.
pub fn click_action(
    html: &str,
    selector: &str,
    base_url: &Url,
    filled: &[(String, String)],
) -> Result<ClickAction, RenderError> {
    let parsed = parse_selector(selector)?;
    let document = Html::parse_document(html);
    let element = document
        .select(&parsed)
        .next()
        .ok_or_else(|| RenderError::ElementNotFound(selector.to_string()))?;

    let not_clickable = || RenderError::NotInteractive {
        selector: selector.to_string(),
        action: "clicked",
    };

    match element.value().name() {
        "a" => element
            .value()
            .attr("href")
            .and_then(|href| resolve_link(href, base_url))
            .map(ClickAction::Follow)
            .ok_or_else(not_clickable),
        "form" => Ok(ClickAction::Submit(build_submission(
            element, None, base_url, filled,
        ))),
        "button" | "input" if is_submit_control(element) => {
            let form = enclosing_form(element).ok_or_else(not_clickable)?;
            Ok(ClickAction::Submit(build_submission(
                form,
                Some(element),
                base_url,
                filled,
            )))
        }
        _ => Err(not_clickable()),
    }
}

fn is_submit_control(element: ElementRef<'_>) -> bool {
    let kind = element
        .value()
        .attr("type")
        .map(str::to_ascii_lowercase);
    match element.value().name() {
        // A button without a type is a submit button
        "button" => matches!(kind.as_deref(), None | Some("submit")),
        "input" => matches!(kind.as_deref(), Some("submit") | Some("image")),
        _ => false,
    }
}

fn enclosing_form(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().name() == "form")
}

fn build_submission(
    form: ElementRef<'_>,
    submitter: Option<ElementRef<'_>>,
    base_url: &Url,
    filled: &[(String, String)],
) -> FormSubmission {
    let mut fields = default_fields(form);

    for (name, value) in filled {
        let mut replaced = false;
        for field in fields.iter_mut().filter(|(n, _)| n == name) {
            field.1 = value.clone();
            replaced = true;
        }
        if !replaced {
            fields.push((name.clone(), value.clone()));
        }
    }

    if let Some(name) = submitter.and_then(|s| s.value().attr("name")) {
        if !name.is_empty() {
            let value = submitter
                .and_then(|s| s.value().attr("value"))
                .unwrap_or_default();
            fields.push((name.to_string(), value.to_string()));
        }
    }

    let action = form
        .value()
        .attr("action")
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .and_then(|a| base_url.join(a).ok())
        .unwrap_or_else(|| base_url.clone());

    let method = match form.value().attr("method") {
        Some(m) if m.eq_ignore_ascii_case("post") => FormMethod::Post,
        _ => FormMethod::Get,
    };

    FormSubmission {
        method,
        action,
        fields,
    }
}

/// Collects the values a form would submit untouched
fn default_fields(form: ElementRef<'_>) -> Vec<(String, String)> {
    let mut fields = Vec::new();
    let Ok(controls) = Selector::parse("input[name], textarea[name], select[name]") else {
        return fields;
    };
    let option_selector = Selector::parse("option").ok();

    for control in form.select(&controls) {
        let element = control.value();
        let Some(name) = element.attr("name").filter(|n| !n.is_empty()) else {
            continue;
        };

        match element.name() {
            "input" => {
                let kind = element.attr("type").unwrap_or("text").to_ascii_lowercase();
                match kind.as_str() {
                    "submit" | "image" | "button" | "reset" | "file" => {}
                    "checkbox" | "radio" => {
                        if element.attr("checked").is_some() {
                            let value = element.attr("value").unwrap_or("on");
                            fields.push((name.to_string(), value.to_string()));
                        }
                    }
                    _ => {
                        let value = element.attr("value").unwrap_or_default();
                        fields.push((name.to_string(), value.to_string()));
                    }
                }
            }
            "textarea" => {
                fields.push((name.to_string(), control.text().collect::<String>()));
            }
            "select" => {
                let Some(option_selector) = option_selector.as_ref() else {
                    continue;
                };
                let options: Vec<ElementRef<'_>> = control.select(option_selector).collect();
                let chosen = options
                    .iter()
                    .find(|o| o.value().attr("selected").is_some())
                    .or_else(|| options.first());
                if let Some(option) = chosen {
                    let value = option
                        .value()
                        .attr("value")
                        .map(str::to_string)
                        .unwrap_or_else(|| option.text().collect::<String>().trim().to_string());
                    fields.push((name.to_string(), value));
                }
            }
            _ => {}
        }
    }

    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://example.com/login").unwrap()
    }

    const LOGIN_FORM: &str = r#"
        <html><body>
            <form id="login" action="/session" method="post">
                <input type="hidden" name="csrf" value="tok123">
                <input id="user" name="username" type="text">
                <input id="pass" name="password" type="password">
                <input type="checkbox" name="remember" checked>
                <input type="checkbox" name="newsletter">
                <select name="lang"><option value="en">English</option><option value="de" selected>Deutsch</option></select>
                <button id="go" type="submit" name="action" value="login">Log in</button>
            </form>
            <a id="home" href="/home">Home</a>
            <div id="banner">Welcome</div>
        </body></html>
    "#;

    #[test]
    fn test_anchor_hrefs_resolved_and_filtered() {
        let html = r##"<html><body>
            <a href="/page1">1</a>
            <a href="page2#frag">2</a>
            <a href="https://other.com/x">3</a>
            <a href="mailto:a@b.c">4</a>
            <a href="#top">5</a>
            <a href="/file.pdf" download>6</a>
        </body></html>"##;
        let links = anchor_hrefs(html, &base_url());
        assert_eq!(
            links,
            vec![
                "https://example.com/page1",
                "https://example.com/page2",
                "https://other.com/x",
                "https://example.com/file.pdf",
            ]
        );
    }

    #[test]
    fn test_asset_refs() {
        let html = r#"<html><head>
            <link rel="stylesheet" href="/css/site.css">
            <link rel="icon" href="/favicon.ico">
            <script src="app.js"></script>
            <script>inline()</script>
        </head><body>
            <img src="/img/logo.png">
            <img src="data:image/png;base64,AAAA">
        </body></html>"#;
        let refs = asset_refs(html, &base_url());
        assert_eq!(
            refs,
            vec![
                "https://example.com/img/logo.png",
                "https://example.com/css/site.css",
                "https://example.com/app.js",
            ]
        );
    }

    #[test]
    fn test_matches_selector() {
        assert!(matches_selector(LOGIN_FORM, "#banner").unwrap());
        assert!(!matches_selector(LOGIN_FORM, "#missing").unwrap());
        assert!(matches!(
            matches_selector(LOGIN_FORM, "###"),
            Err(RenderError::InvalidSelector { .. })
        ));
    }

    #[test]
    fn test_control_name() {
        assert_eq!(control_name(LOGIN_FORM, "#user").unwrap(), "username");
        assert!(matches!(
            control_name(LOGIN_FORM, "#banner"),
            Err(RenderError::NotInteractive { .. })
        ));
        assert!(matches!(
            control_name(LOGIN_FORM, "#nope"),
            Err(RenderError::ElementNotFound(_))
        ));
    }

    #[test]
    fn test_click_submit_button_builds_post() {
        let filled = vec![
            ("username".to_string(), "alice".to_string()),
            ("password".to_string(), "s3cret".to_string()),
        ];
        let action = click_action(LOGIN_FORM, "#go", &base_url(), &filled).unwrap();

        let ClickAction::Submit(submission) = action else {
            panic!("expected form submission");
        };
        assert_eq!(submission.method, FormMethod::Post);
        assert_eq!(submission.action.as_str(), "https://example.com/session");
        assert_eq!(
            submission.fields,
            vec![
                ("csrf".to_string(), "tok123".to_string()),
                ("username".to_string(), "alice".to_string()),
                ("password".to_string(), "s3cret".to_string()),
                ("remember".to_string(), "on".to_string()),
                ("lang".to_string(), "de".to_string()),
                ("action".to_string(), "login".to_string()),
            ]
        );
    }

    #[test]
    fn test_click_anchor_follows_link() {
        let action = click_action(LOGIN_FORM, "#home", &base_url(), &[]).unwrap();
        assert_eq!(
            action,
            ClickAction::Follow(Url::parse("https://example.com/home").unwrap())
        );
    }

    #[test]
    fn test_click_plain_element_rejected() {
        assert!(matches!(
            click_action(LOGIN_FORM, "#banner", &base_url(), &[]),
            Err(RenderError::NotInteractive { .. })
        ));
        assert!(matches!(
            click_action(LOGIN_FORM, "#does-not-exist", &base_url(), &[]),
            Err(RenderError::ElementNotFound(_))
        ));
    }

    #[test]
    fn test_form_without_action_posts_to_current_page() {
        let html = r#"<form method="get"><input name="q" value="rust"><input type="submit" id="s"></form>"#;
        let ClickAction::Submit(submission) =
            click_action(html, "#s", &base_url(), &[]).unwrap()
        else {
            panic!("expected form submission");
        };
        assert_eq!(submission.method, FormMethod::Get);
        assert_eq!(submission.action, base_url());
        assert_eq!(submission.fields, vec![("q".to_string(), "rust".to_string())]);
    }
}
