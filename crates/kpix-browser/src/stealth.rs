//! Anti-bot evasion scripts injected into every leased page.

use chromiumoxide::Page;
use tracing::debug;

/// Evaluated on every leased page so platform bot checks see a regular
/// Chrome profile instead of an automated one.
pub const EVASION_SCRIPTS: &[&str] = &[
    // navigator.webdriver is the first thing most checks probe
    r"
    Object.defineProperty(navigator, 'webdriver', {
        get: () => undefined,
        configurable: true
    });
    ",
    // headless Chrome ships without window.chrome
    r"
    window.chrome = window.chrome || {
        runtime: {},
        loadTimes: function() {},
        app: {}
    };
    ",
    // headless reports an empty plugin list
    r"
    Object.defineProperty(navigator, 'plugins', {
        get: () => [
            { name: 'Chrome PDF Viewer', filename: 'internal-pdf-viewer', description: 'Portable Document Format' },
            { name: 'Native Client', filename: 'internal-nacl-plugin', description: '' }
        ],
        configurable: true
    });
    ",
    r"
    Object.defineProperty(navigator, 'languages', {
        get: () => ['en-US', 'en'],
        configurable: true
    });
    ",
    // notification permission query throws in headless without this shim
    r"
    const kpixOriginalQuery = window.navigator.permissions.query;
    window.navigator.permissions.query = (parameters) => (
        parameters.name === 'notifications'
            ? Promise.resolve({ state: Notification.permission })
            : kpixOriginalQuery(parameters)
    );
    ",
    // chromedriver leaves these markers behind
    r"
    delete window.cdc_adoQpoasnfa76pfcZLmcfl_Array;
    delete window.cdc_adoQpoasnfa76pfcZLmcfl_Promise;
    delete window.cdc_adoQpoasnfa76pfcZLmcfl_Symbol;
    ",
];

/// Install every evasion script on a fresh page. Best effort: injection can
/// fail on non-HTML responses or mid-navigation, which is not fatal.
pub async fn apply_evasions(page: &Page) {
    for script in EVASION_SCRIPTS {
        if let Err(err) = page.evaluate((*script).to_string()).await {
            debug!("evasion script skipped: {err}");
        }
    }
}
