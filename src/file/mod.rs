// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! File-level APIs: footer validation and metadata.

pub mod footer;
pub mod metadata;

/// Length of the footer trailer: 4-byte metadata length plus the magic.
pub const FOOTER_SIZE: u64 = 8;

/// The file magic, present at offset 0 and at the very end of the file.
/// Only the trailing occurrence is authoritative.
pub const PARQUET_MAGIC: [u8; 4] = *b"PAR1";
