// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Tests that need a real main thread binding and a real run-loop.
