//! Starter scripts shown when the editor opens or the language changes.

use crate::language::ScriptLanguage;

const KOTLIN_TEMPLATE: &str = "\
// Kotlin Script - top-level code runs automatically
println(\"Hello from Kotlin!\")
Thread.sleep(1000)
println(\"Done.\")";

const SWIFT_TEMPLATE: &str = "\
import Foundation

print(\"Hello from Swift!\")
Thread.sleep(forTimeInterval: 1.0)
print(\"Done.\")";

/// Default code template for `language`.
pub fn template_for(language: ScriptLanguage) -> &'static str {
    match language {
        ScriptLanguage::Kotlin => KOTLIN_TEMPLATE,
        ScriptLanguage::Swift => SWIFT_TEMPLATE,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
